use diesel::prelude::*;
use std::collections::{BTreeSet, HashMap};

use crate::db::schema::{article_tags, tags};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

/// Cleans up tag names as typed by an author: surrounding blanks and a
/// leading `#` go, empty names are dropped, duplicates collapse.
pub fn normalize<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref().trim().trim_start_matches('#').trim();
            if name.is_empty() || !seen.insert(name.to_string()) {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

impl Tag {
    pub fn find_by_name(name: &str, connection: &mut SqliteConnection) -> QueryResult<Option<Tag>> {
        tags::table
            .filter(tags::name.eq(name))
            .select(Tag::as_select())
            .first(connection)
            .optional()
    }

    fn find_or_create(name: &str, connection: &mut SqliteConnection) -> QueryResult<Tag> {
        diesel::insert_into(tags::table)
            .values(tags::name.eq(name))
            .on_conflict_do_nothing()
            .execute(connection)?;
        tags::table
            .filter(tags::name.eq(name))
            .select(Tag::as_select())
            .first(connection)
    }

    /// Replaces the tag set of an article. Names must already be normalized.
    pub fn set_for_article(
        article_id: i32,
        names: &[String],
        connection: &mut SqliteConnection,
    ) -> QueryResult<()> {
        diesel::delete(article_tags::table.filter(article_tags::article_id.eq(article_id)))
            .execute(connection)?;
        for name in names {
            let tag = Tag::find_or_create(name, connection)?;
            diesel::insert_into(article_tags::table)
                .values((
                    article_tags::article_id.eq(article_id),
                    article_tags::tag_id.eq(tag.id),
                ))
                .execute(connection)?;
        }
        Ok(())
    }

    /// Tag names per article, alphabetical.
    pub fn names_for_articles(
        article_ids: &[i32],
        connection: &mut SqliteConnection,
    ) -> QueryResult<HashMap<i32, Vec<String>>> {
        let rows = article_tags::table
            .inner_join(tags::table)
            .filter(article_tags::article_id.eq_any(article_ids))
            .order((article_tags::article_id, tags::name))
            .select((article_tags::article_id, tags::name))
            .load::<(i32, String)>(connection)?;

        let mut names: HashMap<i32, Vec<String>> = HashMap::new();
        for (article_id, name) in rows {
            names.entry(article_id).or_default().push(name);
        }
        Ok(names)
    }

    /// Distinct ids of the tags carried by any of the given articles.
    pub fn ids_for_articles(
        article_ids: &[i32],
        connection: &mut SqliteConnection,
    ) -> QueryResult<Vec<i32>> {
        article_tags::table
            .filter(article_tags::article_id.eq_any(article_ids))
            .select(article_tags::tag_id)
            .distinct()
            .load(connection)
    }
}
