// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Errors raised by the tone engine. None of these are fatal: the engine logs
/// them and keeps running, but they are returned so callers can observe them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToneError {
    #[error("unknown note '{0}'")]
    UnknownNote(String),

    #[error("invalid frequency {hz} Hz for note {note}")]
    InvalidFrequency { note: String, hz: f64 },

    #[error("unknown chord '{0}'")]
    UnknownChord(String),

    #[error("tone backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("tone backend failed to start tone: {0}")]
    Backend(String),
}
