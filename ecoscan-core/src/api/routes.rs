macro_rules! api_path {
    ($path:literal) => {
        concat!("/api", $path)
    };
}

/// Backend route definitions used by the client
pub mod auth {
    pub const LOGIN: &str = api_path!("/login");
    pub const SIGNUP: &str = api_path!("/signup");
    pub const LOGOUT: &str = api_path!("/logout");
}

pub mod profile {
    /// `GET` reads, `POST` updates. A 2xx `GET` also doubles as the session
    /// check.
    pub const ITEM: &str = api_path!("/profile");
}

pub mod scan {
    pub const SUBMIT: &str = api_path!("/scan");
    pub const TASK: &str = api_path!("/tasks/{task_id}");
}

pub mod history {
    pub const COLLECTION: &str = api_path!("/history");
    pub const CLEAR: &str = api_path!("/history/clear");
}

pub mod chat {
    pub const ASK: &str = api_path!("/chat");
}

/// Helper utilities for working with route templates
pub mod utils {
    /// Replace a single path parameter (e.g. `"{task_id}"`) with the provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }

    /// Percent-encode a value for use as one path segment.
    pub fn encode_segment(value: &str) -> String {
        // form encoding writes spaces as '+', which a path would keep literally
        url::form_urlencoded::byte_serialize(value.as_bytes())
            .collect::<String>()
            .replace('+', "%20")
    }
}

/// `/api/tasks/{task_id}` for a concrete job. The id is escaped as a single
/// path segment.
pub fn task_path(task_id: &ecoscan_model::TaskId) -> String {
    utils::replace_param(
        scan::TASK,
        "{task_id}",
        utils::encode_segment(task_id.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecoscan_model::TaskId;

    #[test]
    fn task_path_substitutes_id() {
        assert_eq!(task_path(&TaskId::new("abc")), "/api/tasks/abc");
        assert_eq!(scan::SUBMIT, "/api/scan");
        assert_eq!(history::CLEAR, "/api/history/clear");
    }

    #[test]
    fn task_path_escapes_reserved_characters() {
        assert_eq!(
            task_path(&TaskId::new("a/b?c#d")),
            "/api/tasks/a%2Fb%3Fc%23d"
        );
        assert_eq!(task_path(&TaskId::new("x y+z")), "/api/tasks/x%20y%2Bz");
    }
}
