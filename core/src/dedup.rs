use crate::document::{BoundingBox, Location};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Drops places that repeat an earlier place's name at the same spot.
///
/// Keys are lower-cased names; only area places record a box.
#[derive(Default)]
pub struct DuplicateFilter {
    boxes: Mutex<HashMap<String, BoundingBox>>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the place duplicates one seen earlier.
    pub fn is_duplicate(&self, name: &str, location: &Location) -> bool {
        let key = name.to_lowercase();
        if key.is_empty() {
            return false;
        }
        let mut boxes = self.boxes.lock();
        match *location {
            Location::Point { lat, lon } => boxes.get(&key).is_some_and(|bb| bb.contains_point(lat, lon)),
            Location::Area(current) => match boxes.get(&key).copied() {
                None => {
                    boxes.insert(key, current);
                    false
                }
                Some(prev) => {
                    let contained = prev.contains(&current);
                    if !contained {
                        boxes.insert(key, current);
                    }
                    contained || current.contains(&prev)
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(a: f64, b: f64, c: f64, d: f64) -> Location {
        Location::Area(BoundingBox::new(a, b, c, d))
    }

    #[test]
    fn same_name_inside_previous_area_is_duplicate() {
        let f = DuplicateFilter::new();
        assert!(!f.is_duplicate("Taman Suropati", &area(0.0, 0.0, 10.0, 10.0)));
        assert!(f.is_duplicate("taman suropati", &area(1.0, 1.0, 2.0, 2.0)));
        assert!(f.is_duplicate("TAMAN SUROPATI", &Location::Point { lat: 5.0, lon: 5.0 }));
        assert!(!f.is_duplicate("Taman Suropati", &Location::Point { lat: 50.0, lon: 5.0 }));
    }

    #[test]
    fn enclosing_area_is_duplicate_and_replaces_box() {
        let f = DuplicateFilter::new();
        assert!(!f.is_duplicate("Pasar", &area(1.0, 1.0, 2.0, 2.0)));
        assert!(f.is_duplicate("Pasar", &area(0.0, 0.0, 3.0, 3.0)));
        // the larger box is now stored
        assert!(f.is_duplicate("Pasar", &Location::Point { lat: 2.5, lon: 2.5 }));
    }

    #[test]
    fn unnamed_and_points_are_never_recorded() {
        let f = DuplicateFilter::new();
        assert!(!f.is_duplicate("", &area(0.0, 0.0, 1.0, 1.0)));
        assert!(!f.is_duplicate("", &area(0.0, 0.0, 1.0, 1.0)));
        assert!(!f.is_duplicate("Halte", &Location::Point { lat: 1.0, lon: 1.0 }));
        assert!(!f.is_duplicate("Halte", &Location::Point { lat: 1.0, lon: 1.0 }));
        assert!(f.is_empty());
    }
}
