//! # Naming Conventions
//!
//! Maps a fetch-store base name to the identifiers it generates.
//!
//! For `baseName = "getThing"`:
//!
//! | identifier           | value                     |
//! |----------------------|---------------------------|
//! | action creator       | `fetchGetThing`           |
//! | receive creator      | `receiveGetThing`         |
//! | in-flight selector   | `isFetchingGetThing`      |
//! | start type           | `START_FETCH_GET_THING`   |
//! | effect type          | `FETCH_GET_THING`         |
//! | receive type         | `RECEIVE_GET_THING`       |
//! | finish type          | `FINISH_FETCH_GET_THING`  |
//! | catch type           | `CATCH_FETCH_GET_THING`   |

use crate::StoreError;

/// The identifiers derived from one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchNames {
    pub base_name: String,
    pub pascal: String,
    pub constant: String,
    pub fetch_action: String,
    pub receive_action: String,
    /// Also the name of the in-flight state slice.
    pub is_fetching_selector: String,
    pub start_type: String,
    pub fetch_type: String,
    pub receive_type: String,
    pub finish_type: String,
    pub catch_type: String,
}

impl FetchNames {
    /// Derive all identifiers for `base_name`.
    ///
    /// Returns `StoreError::Composition` if the name has no alphanumeric words.
    pub fn new(base_name: &str) -> Result<Self, StoreError> {
        let words = split_words(base_name);
        if words.is_empty() {
            return Err(StoreError::Composition(format!(
                "base name must be a non-empty identifier, got {:?}",
                base_name
            )));
        }

        let pascal = pascal_case(base_name);
        let constant = words.join("_").to_uppercase();

        Ok(Self {
            base_name: base_name.to_string(),
            fetch_action: format!("fetch{pascal}"),
            receive_action: format!("receive{pascal}"),
            is_fetching_selector: format!("isFetching{pascal}"),
            start_type: format!("START_FETCH_{constant}"),
            fetch_type: format!("FETCH_{constant}"),
            receive_type: format!("RECEIVE_{constant}"),
            finish_type: format!("FINISH_FETCH_{constant}"),
            catch_type: format!("CATCH_FETCH_{constant}"),
            pascal,
            constant,
        })
    }

    /// All five action types, in lifecycle order.
    #[must_use]
    pub fn action_types(&self) -> [&str; 5] {
        [
            &self.start_type,
            &self.fetch_type,
            &self.receive_type,
            &self.finish_type,
            &self.catch_type,
        ]
    }
}

/// Upper-case the first character of every separator-delimited chunk and
/// drop the separators: `search-console` -> `SearchConsole`.
#[must_use]
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .flat_map(|chunk| {
            let mut chars = chunk.chars();
            chars.next().into_iter().flat_map(char::to_uppercase).chain(chars)
        })
        .collect()
}

/// `getURLParams` -> `GET_URL_PARAMS`.
#[must_use]
pub fn constant_case(name: &str) -> String {
    split_words(name).join("_").to_uppercase()
}

/// Split an identifier into words on separators, case changes and digit runs.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(char::is_lowercase));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

// =============================================================================
// TESTS
// =============================================================================
