//! Built-in and user-defined pattern presets.
//!
//! User presets are stored as a JSON array in a single file with camelCase
//! field names, with cells written as 0 (off), 1 (normal) or 2 (accent).

use super::pattern::{ClickState, Pattern};
use super::{DEFAULT_BEATS, MAX_BEATS, MAX_MEASURES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving presets.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset name must not be empty")]
    EmptyName,
    #[error("no preset at index {0}")]
    NotFound(usize),
    #[error("built-in preset '{0}' cannot be removed")]
    BuiltIn(String),
    #[error("failed to access presets file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse presets file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode presets for {}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    /// Click states, measure-major. Rows and columns beyond the grid are
    /// ignored; missing ones are Off.
    pub pattern: Vec<Vec<ClickState>>,
    /// Beats per active measure; measures without an entry get the default.
    pub beats_per_measure: Vec<usize>,
    pub num_measures: usize,
    #[serde(default)]
    pub is_user_defined: bool,
}

impl Preset {
    /// Captures a pattern as a user preset.
    pub fn from_pattern(name: impl Into<String>, pattern: &Pattern) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.rows().iter().map(|row| row.to_vec()).collect(),
            beats_per_measure: pattern.beats_per_measure().to_vec(),
            num_measures: pattern.num_measures(),
            is_user_defined: true,
        }
    }

    /// Builds the pattern this preset describes, clamping any out-of-range
    /// counts.
    pub fn to_pattern(&self) -> Pattern {
        let mut pattern = Pattern::new();
        pattern.set_num_measures(self.num_measures);
        for measure in 0..MAX_MEASURES {
            let beats = self
                .beats_per_measure
                .get(measure)
                .copied()
                .unwrap_or(DEFAULT_BEATS);
            pattern.set_beats(measure, beats);
        }
        for (measure, row) in self.pattern.iter().take(MAX_MEASURES).enumerate() {
            for (beat, &state) in row.iter().take(MAX_BEATS).enumerate() {
                pattern.set_cell(measure, beat, state);
            }
        }
        pattern
    }
}

fn builtin(name: &str, beats_per_measure: &[usize], rows: &[[u8; 8]]) -> Preset {
    let mut pattern = vec![vec![ClickState::Off; MAX_BEATS]; MAX_MEASURES];
    for (row, cells) in pattern.iter_mut().zip(rows) {
        for (slot, &value) in row.iter_mut().zip(cells) {
            *slot = ClickState::try_from(value).unwrap_or_default();
        }
    }
    Preset {
        name: name.to_string(),
        pattern,
        beats_per_measure: beats_per_measure.to_vec(),
        num_measures: beats_per_measure.len(),
        is_user_defined: false,
    }
}

/// The presets shipped with the application.
pub fn builtin_presets() -> Vec<Preset> {
    let full = [2, 1, 1, 1, 0, 0, 0, 0];
    let waltz = [2, 1, 1, 0, 0, 0, 0, 0];
    let five = [2, 1, 1, 1, 1, 0, 0, 0];
    let swing = [0, 1, 0, 1, 0, 0, 0, 0];

    vec![
        builtin("Empty", &[4; 4], &[]),
        builtin("Full (4/4)", &[4; 4], &[full; 4]),
        builtin("3/4 Waltz", &[3; 4], &[waltz; 4]),
        builtin("5/4 Time", &[5; 4], &[five; 4]),
        builtin("Jazz Swing", &[4; 4], &[swing; 4]),
        builtin(
            "Son Clave (3-2)",
            &[8, 8],
            &[[2, 0, 0, 1, 0, 0, 1, 0], [0, 0, 0, 0, 1, 0, 1, 0]],
        ),
        builtin(
            "Bossa Nova",
            &[8, 8],
            &[[2, 0, 0, 1, 0, 1, 0, 1], [0, 1, 0, 1, 0, 0, 1, 0]],
        ),
        builtin("Funk Groove 1", &[8], &[[2, 0, 1, 0, 2, 1, 0, 1]]),
    ]
}

/// Built-in presets followed by the user's own.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    builtins: Vec<Preset>,
    user: Vec<Preset>,
    path: Option<PathBuf>,
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PresetLibrary {
    /// A library whose user presets are never persisted.
    pub fn in_memory() -> Self {
        Self {
            builtins: builtin_presets(),
            user: Vec::new(),
            path: None,
        }
    }

    /// Loads user presets from a JSON file.
    ///
    /// A missing file is not an error; the library starts with no user
    /// presets and creates the file on the first save.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PresetError> {
        let path = path.as_ref().to_path_buf();
        let mut library = Self::in_memory();

        if path.exists() {
            let json = fs::read_to_string(&path).map_err(|source| PresetError::Io {
                path: path.clone(),
                source,
            })?;
            let mut user: Vec<Preset> =
                serde_json::from_str(&json).map_err(|source| PresetError::Parse {
                    path: path.clone(),
                    source,
                })?;
            for preset in &mut user {
                preset.is_user_defined = true;
            }
            tracing::info!("Loaded {} user presets from {}", user.len(), path.display());
            library.user = user;
        }

        library.path = Some(path);
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.builtins.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All presets in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.builtins.iter().chain(self.user.iter())
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.iter().nth(index)
    }

    /// Finds a preset by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Saves the pattern as a new user preset and writes the presets file.
    ///
    /// The preset stays in the library even if writing the file fails.
    ///
    /// # Returns
    ///
    /// Index of the new preset in display order
    ///
    /// # Errors
    ///
    /// Returns error if the name is blank or the file cannot be written
    pub fn add_user(&mut self, name: &str, pattern: &Pattern) -> Result<usize, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }

        self.user.push(Preset::from_pattern(name, pattern));
        tracing::info!("Saved user preset '{}'", name);
        self.save()?;
        Ok(self.len() - 1)
    }

    /// Removes a user preset by its display index and writes the presets file.
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or names a built-in preset,
    /// or if the file cannot be written
    pub fn remove_user(&mut self, index: usize) -> Result<Preset, PresetError> {
        if let Some(builtin) = self.builtins.get(index) {
            return Err(PresetError::BuiltIn(builtin.name.clone()));
        }
        let user_index = index - self.builtins.len();
        if user_index >= self.user.len() {
            return Err(PresetError::NotFound(index));
        }

        let removed = self.user.remove(user_index);
        tracing::info!("Deleted user preset '{}'", removed.name);
        self.save()?;
        Ok(removed)
    }

    /// Writes the user presets to the presets file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn save(&self) -> Result<(), PresetError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.user).map_err(|source| {
            PresetError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| PresetError::Io {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metronome::Cursor;

    #[test]
    fn test_builtin_presets() {
        let presets = builtin_presets();
        let names: Vec<_> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Empty",
                "Full (4/4)",
                "3/4 Waltz",
                "5/4 Time",
                "Jazz Swing",
                "Son Clave (3-2)",
                "Bossa Nova",
                "Funk Groove 1",
            ]
        );
        assert!(presets.iter().all(|p| !p.is_user_defined));
        assert!(presets.iter().all(|p| p.beats_per_measure.len() == p.num_measures));
    }

    #[test]
    fn test_waltz_pattern() {
        let pattern = builtin_presets()[2].to_pattern();
        assert_eq!(pattern.beats_per_measure(), &[3, 3, 3, 3]);
        assert_eq!(pattern.cell(1, 0), ClickState::Accent);
        assert_eq!(pattern.cell(1, 2), ClickState::Normal);
        assert_eq!(pattern.cycle_length(), 12);
    }

    #[test]
    fn test_clave_pattern() {
        let clave = builtin_presets()
            .into_iter()
            .find(|p| p.name == "Son Clave (3-2)")
            .unwrap()
            .to_pattern();
        assert_eq!(clave.num_measures(), 2);
        let hits: Vec<Cursor> = (0..clave.cycle_length())
            .map(|i| clave.position_at(i))
            .filter(|c| clave.cell(c.measure, c.beat) != ClickState::Off)
            .collect();
        assert_eq!(
            hits,
            vec![
                Cursor::new(0, 0),
                Cursor::new(0, 3),
                Cursor::new(0, 6),
                Cursor::new(1, 4),
                Cursor::new(1, 6),
            ]
        );
    }

    #[test]
    fn test_preset_round_trips_pattern() {
        let mut pattern = Pattern::new();
        pattern.set_num_measures(3);
        pattern.set_beats(1, 7);
        pattern.set_cell(1, 6, ClickState::Accent);
        // Hidden edits survive too
        pattern.set_cell(6, 15, ClickState::Normal);

        let preset = Preset::from_pattern("Mine", &pattern);
        assert_eq!(preset.beats_per_measure, vec![4, 7, 4]);
        assert!(preset.is_user_defined);
        assert_eq!(preset.to_pattern(), pattern);
    }

    #[test]
    fn test_camel_case_json_format() {
        let json = r#"{
            "name": "Two",
            "pattern": [[2, 0, 1], [1]],
            "beatsPerMeasure": [3, 20],
            "numMeasures": 2,
            "isUserDefined": true
        }"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        let pattern = preset.to_pattern();
        assert_eq!(pattern.beats_per_measure(), &[3, MAX_BEATS]);
        assert_eq!(pattern.cell(0, 0), ClickState::Accent);
        assert_eq!(pattern.cell(0, 2), ClickState::Normal);
        assert_eq!(pattern.cell(1, 1), ClickState::Off);

        let written = serde_json::to_value(&preset).unwrap();
        assert!(written.get("beatsPerMeasure").is_some());
        assert!(written.get("numMeasures").is_some());
        assert_eq!(written["pattern"][0][0], 2);
    }

    #[test]
    fn test_invalid_click_state_rejected() {
        let json = r#"{"name":"Bad","pattern":[[3]],"beatsPerMeasure":[4],"numMeasures":1}"#;
        assert!(serde_json::from_str::<Preset>(json).is_err());
    }

    #[test]
    fn test_missing_file_means_no_user_presets() {
        let dir = tempfile::tempdir().unwrap();
        let library = PresetLibrary::load(dir.path().join("presets.json")).unwrap();
        assert_eq!(library.len(), builtin_presets().len());
    }

    #[test]
    fn test_user_presets_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let mut pattern = Pattern::new();
        pattern.set_cell(0, 0, ClickState::Accent);
        let mut library = PresetLibrary::load(&path).unwrap();
        let index = library.add_user("  Practice  ", &pattern).unwrap();
        assert_eq!(index, 8);
        assert!(path.exists());

        let reloaded = PresetLibrary::load(&path).unwrap();
        let preset = reloaded.get(index).unwrap();
        assert_eq!(preset.name, "Practice");
        assert!(preset.is_user_defined);
        assert_eq!(preset.to_pattern(), pattern);
        assert!(reloaded.find("practice").is_some());
    }

    #[test]
    fn test_remove_user_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let mut library = PresetLibrary::load(&path).unwrap();
        library.add_user("A", &Pattern::new()).unwrap();
        library.add_user("B", &Pattern::new()).unwrap();

        assert!(matches!(library.remove_user(0), Err(PresetError::BuiltIn(_))));
        assert!(matches!(library.remove_user(42), Err(PresetError::NotFound(42))));
        assert_eq!(library.remove_user(8).unwrap().name, "A");

        let reloaded = PresetLibrary::load(&path).unwrap();
        assert_eq!(reloaded.len(), 9);
        assert_eq!(reloaded.get(8).unwrap().name, "B");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut library = PresetLibrary::in_memory();
        assert!(matches!(
            library.add_user("   ", &Pattern::new()),
            Err(PresetError::EmptyName)
        ));
        assert_eq!(library.len(), 8);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PresetLibrary::load(&path),
            Err(PresetError::Parse { .. })
        ));
    }

    #[test]
    fn test_encode_error_is_not_reported_as_parse() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = PresetError::Serialize {
            path: PathBuf::from("presets.json"),
            source,
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to encode presets"));
        assert!(!message.contains("parse"));
    }
}
