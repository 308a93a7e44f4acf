use chrono::{NaiveDateTime, SecondsFormat};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::{Json, Value};
use serde::{Serialize, Serializer};

pub fn try_respond(req: &Request<'_>, json: &Value, status: Status) -> response::Result<'static> {
    let response = Json(json.clone()).respond_to(req)?;
    Response::build_from(response).status(status).ok()
}

pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = date.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

/// The `{ "message": ... }` body used by personal actions that do not bounce
/// back to a page.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<M: Into<String>>(message: M) -> Json<MessageResponse> {
        Json(MessageResponse {
            message: message.into(),
        })
    }
}

/// Picks between the "none", "one" and "many" wording of a count message.
pub fn count_message(count: usize, none: &str, one: &str, many: impl FnOnce(usize) -> String) -> String {
    match count {
        0 => none.to_string(),
        1 => one.to_string(),
        n => many(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Serialize)]
    struct Stamped {
        #[serde(serialize_with = "serialize_date")]
        at: NaiveDateTime,
    }

    #[test]
    fn dates_serialize_as_utc_millis() {
        let at = NaiveDate::from_ymd_opt(2023, 3, 27)
            .and_then(|d| d.and_hms_milli_opt(7, 45, 0, 120))
            .unwrap();
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        assert_eq!(json, r#"{"at":"2023-03-27T07:45:00.120Z"}"#);
    }

    #[test]
    fn count_message_picks_wording() {
        let many = |n| format!("{} things", n);
        assert_eq!(count_message(0, "nothing", "one thing", many), "nothing");
        assert_eq!(count_message(1, "nothing", "one thing", many), "one thing");
        assert_eq!(count_message(4, "nothing", "one thing", many), "4 things");
    }
}
