//! Begin/complete logging around a unit of work
//!
//! - `{name}_BEGIN` on creation (INFO)
//! - `{name}_COMPLETE` on `complete()` with `elapsed_ms` (INFO)
//! - `{name}_FAILED` on `fail()` (ERROR)
//! - `{name}_INCOMPLETE` if dropped without either (WARN)

use std::cell::Cell;
use std::time::Instant;

use super::events::Event;
use super::logger::Logger;

pub struct ObservationScope {
    name: &'static str,
    completed: Cell<bool>,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
}

impl ObservationScope {
    pub fn new(event: Event) -> Self {
        Self::with_fields(event, &[])
    }

    /// Fields given here are repeated on the closing line.
    pub fn with_fields(event: Event, fields: &[(&'static str, &str)]) -> Self {
        let name = event.as_str();
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.extend(extra_fields.iter().copied());
        all_fields.push(("elapsed_ms", elapsed.as_str()));

        Logger::info(&format!("{}_COMPLETE", self.name), &all_fields);
    }

    pub fn fail(self, reason: &str) {
        self.completed.set(true);

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.push(("reason", reason));

        Logger::error(&format!("{}_FAILED", self.name), &all_fields);
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Wall-clock duration timer
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::with_fields(Event::IndexDocument, &[("document_id", "d1")]);
        assert!(!scope.is_completed());
        scope.complete_with_fields(&[("tokens", "7")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new(Event::JournalReplay);
        scope.fail("checksum mismatch");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new(Event::IndexDocument);
        drop(scope);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 5);
    }
}
