//! Structured patient address.

use serde::{Deserialize, Serialize};

use super::clean_text;

/// Postal address split into the parts the location reports group on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// Village or town
    pub village_town: Option<String>,
    /// City / district
    pub city: Option<String>,
    /// State
    pub state: Option<String>,
    /// Postal PIN code
    pub pincode: Option<String>,
}

impl Address {
    /// Build from form fields, trimming blanks to `None`.
    pub fn new(
        village_town: Option<String>,
        city: Option<String>,
        state: Option<String>,
        pincode: Option<String>,
    ) -> Self {
        Self {
            village_town: clean_text(village_town),
            city: clean_text(city),
            state: clean_text(state),
            pincode: clean_text(pincode),
        }
    }

    /// Parse a legacy free-text address of the form
    /// `"village, city, state[, India - pincode]"`.
    ///
    /// Returns `None` when fewer than three non-empty parts are present, so a
    /// malformed address is reported rather than counted under the wrong city.
    pub fn parse_legacy(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 3 {
            return None;
        }

        let mut pincode = None;
        let mut state = strip_country(parts[2]);
        if let Some(pin) = extract_pincode(parts[2]) {
            pincode = Some(pin);
            let head = parts[2].rsplit_once('-').map(|(head, _)| head).unwrap_or_default();
            state = strip_country(head);
        }
        for tail in &parts[3..] {
            if let Some(pin) = extract_pincode(tail) {
                pincode = Some(pin);
            }
        }

        let address = Self::new(
            Some(parts[0].to_string()),
            Some(parts[1].to_string()),
            Some(state),
            pincode,
        );
        address.state.as_ref()?;
        Some(address)
    }

    /// Whether no part of the address is filled in.
    pub fn is_empty(&self) -> bool {
        self.village_town.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.pincode.is_none()
    }

    /// Single-line rendering, skipping missing parts.
    pub fn display_line(&self) -> String {
        let mut line = [&self.village_town, &self.city, &self.state]
            .iter()
            .filter_map(|p| p.as_deref())
            .collect::<Vec<_>>()
            .join(", ");
        if let Some(pin) = &self.pincode {
            if !line.is_empty() {
                line.push_str(" - ");
            }
            line.push_str(pin);
        }
        line
    }
}

fn strip_country(part: &str) -> String {
    part.replace("India", "").trim().trim_end_matches('-').trim().to_string()
}

fn extract_pincode(part: &str) -> Option<String> {
    let (_, tail) = part.rsplit_once('-')?;
    let tail = tail.trim();
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
        Some(tail.to_string())
    } else {
        None
    }
}
