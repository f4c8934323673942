use serde::Serialize;

/// What a consumer renders for one SWR resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwrState<T> {
    pub data: T,
    /// True only during a foreground fetch (first load or manual refetch)
    pub loading: bool,
    pub error: Option<String>,
    pub is_stale: bool,
    /// Epoch milliseconds when `data` was fetched
    pub last_updated: Option<i64>,
}

impl<T> SwrState<T> {
    pub fn new(default_data: T) -> Self {
        Self {
            data: default_data,
            loading: false,
            error: None,
            is_stale: false,
            last_updated: None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SwrState::new(Vec::<u8>::new());
        assert!(!state.loading);
        assert!(!state.is_stale);
        assert!(!state.has_error());
        assert_eq!(state.last_updated, None);
    }

    #[test]
    fn test_serializes_for_ui_bridge() {
        let state = SwrState::new(1);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "data": 1, "loading": false, "error": null,
                "isStale": false, "lastUpdated": null
            })
        );
    }
}
