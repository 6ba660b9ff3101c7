//! Viewer configuration: per-domain presets plus an optional JSON override file.

macro_rules! settings_enum {
    ($(#[$attr:meta])* $vis:vis enum $name:ident { $($(#[$var_attr:meta])* $variant:ident => $label:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
        #[serde(rename_all = "snake_case")] $(#[$attr])*
        $vis enum $name { $($(#[$var_attr])* $variant,)+ }
        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self { $(Self::$variant => $label),+ })
            }
        }
    };
}

pub mod data;
pub mod persistence;

pub use data::{Domain, ProjectionMode, Settings, SourceConfig, Theme, ViewerConfig};
pub use persistence::SettingsManager;
