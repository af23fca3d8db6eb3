//! Container selection and liveness classification

use crate::models::ContainerHandle;

/// Liveness state as far as status reporting is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited,
    /// Any other runtime state (paused, restarting, created, ...).
    /// Such containers produce no status sample.
    Unknown,
}

impl ContainerStatus {
    /// Numeric liveness code, `None` for states that are not reported
    pub fn code(&self) -> Option<f64> {
        match self {
            ContainerStatus::Running => Some(1.0),
            ContainerStatus::Exited => Some(0.0),
            ContainerStatus::Unknown => None,
        }
    }
}

/// Keep containers whose name contains `selector` (case-sensitive substring)
pub fn select_in_scope<'a>(
    containers: &'a [ContainerHandle],
    selector: &str,
) -> Vec<&'a ContainerHandle> {
    containers
        .iter()
        .filter(|c| is_in_scope(c, selector))
        .collect()
}

/// Substring match against the raw runtime name
pub fn is_in_scope(container: &ContainerHandle, selector: &str) -> bool {
    container.name.contains(selector)
}

/// Map the runtime's state literal onto the closed status set
pub fn classify_status(container: &ContainerHandle) -> ContainerStatus {
    match container.status.as_str() {
        "running" => ContainerStatus::Running,
        "exited" => ContainerStatus::Exited,
        _ => ContainerStatus::Unknown,
    }
}

/// Strip a single leading `/` from a runtime-prefixed name
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str, status: &str) -> ContainerHandle {
        ContainerHandle {
            id: format!("id-{}", name.trim_start_matches('/')),
            name: name.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_select_in_scope() {
        let containers = vec![
            handle("app1", "running"),
            handle("/my-app-2", "exited"),
            handle("web", "running"),
        ];

        let selected: Vec<&str> = select_in_scope(&containers, "app")
            .iter()
            .map(|c| c.name.as_str())
            .collect();

        assert_eq!(selected, vec!["app1", "/my-app-2"]);
    }

    #[test]
    fn test_select_is_case_sensitive() {
        let containers = vec![handle("APP1", "running")];
        assert!(select_in_scope(&containers, "app").is_empty());
    }

    #[test]
    fn test_selector_is_not_a_pattern() {
        let containers = vec![handle("app1", "running")];
        assert!(select_in_scope(&containers, "a*").is_empty());
        assert!(select_in_scope(&containers, "^app").is_empty());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(&handle("a", "running")),
            ContainerStatus::Running
        );
        assert_eq!(
            classify_status(&handle("a", "exited")),
            ContainerStatus::Exited
        );
        assert_eq!(
            classify_status(&handle("a", "paused")),
            ContainerStatus::Unknown
        );
        assert_eq!(
            classify_status(&handle("a", "Running")),
            ContainerStatus::Unknown
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ContainerStatus::Running.code(), Some(1.0));
        assert_eq!(ContainerStatus::Exited.code(), Some(0.0));
        assert_eq!(ContainerStatus::Unknown.code(), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("/app1"), "app1");
        assert_eq!(normalize_name("app1"), "app1");
        assert_eq!(normalize_name(normalize_name("/app1")), "app1");
        // Only one separator is stripped
        assert_eq!(normalize_name("//app1"), "/app1");
        assert_eq!(normalize_name(""), "");
    }
}
