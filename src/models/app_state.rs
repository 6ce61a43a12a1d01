use camino::Utf8PathBuf;

/// Single source of truth for the GUI state.
///
/// Wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`];
/// mutate it only through the manager so change events are emitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Factory image archive chosen by the user
    pub factory_image_path: Option<Utf8PathBuf>,

    /// Replacement images, in the order they were picked
    pub payload_paths: Vec<Utf8PathBuf>,

    /// True while a build is running; the UI disables its triggers
    pub is_building: bool,

    /// Artifact produced by the most recent successful build
    pub last_artifact: Option<Utf8PathBuf>,
}

impl AppState {
    /// Whether the inputs are complete enough to start a build
    pub fn can_build(&self) -> bool {
        !self.is_building && self.factory_image_path.is_some()
    }

    /// Payload list in the `;`-joined form shown in the UI text field
    pub fn joined_payload_paths(&self) -> String {
        self.payload_paths
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(!state.is_building);
        assert!(!state.can_build());
        assert!(state.payload_paths.is_empty());
    }

    #[test]
    fn test_can_build_requires_factory_image() {
        let mut state = AppState {
            factory_image_path: Some("/tmp/factory.zip".into()),
            ..Default::default()
        };
        assert!(state.can_build());

        state.is_building = true;
        assert!(!state.can_build());
    }

    #[test]
    fn test_joined_payload_paths() {
        let state = AppState {
            payload_paths: vec!["/a/boot.img".into(), "/a/system.img".into()],
            ..Default::default()
        };
        assert_eq!(state.joined_payload_paths(), "/a/boot.img;/a/system.img");
    }
}
