//! Bounded, expiring cache of generated images
//!
//! Identical requests (same canvas pixels, room, style, knobs, and step count)
//! skip inference while the entry is fresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::GenerationRequest;

struct Entry {
    image: Arc<RgbImage>,
    inserted: Instant,
}

/// Insertion-ordered cache with a time-to-live
pub struct GenerationCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl std::fmt::Debug for GenerationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCache")
            .field("len", &self.entries.lock().len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl GenerationCache {
    /// Create a cache. Capacity 0 disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// Key covering every input that affects the output
    pub fn key(request: &GenerationRequest, steps: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.canvas.fingerprint().as_bytes());
        for part in [
            request.room_type.name(),
            request.style_name.as_str(),
            request.style_description.as_str(),
        ] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.update(request.strength.to_bits().to_le_bytes());
        hasher.update(request.guidance.to_bits().to_le_bytes());
        hasher.update(steps.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Fresh entry for `key`, if any
    pub fn get(&self, key: &str) -> Option<Arc<RgbImage>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => return Some(entry.image.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store an image, evicting expired entries and then the oldest
    pub fn insert(&self, key: String, image: Arc<RgbImage>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted.elapsed() < ttl);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                image,
                inserted: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::canvas::normalize;
    use crate::design::{style, GenerationParams, RoomType};
    use image::Rgb;

    fn img(v: u8) -> Arc<RgbImage> {
        Arc::new(RgbImage::from_pixel(2, 2, Rgb([v, v, v])))
    }

    fn request(room: RoomType, style_name: &str, strength: f32) -> GenerationRequest {
        let photo = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        GenerationRequest::new(
            Arc::new(normalize(&photo, 8).unwrap()),
            room,
            style::lookup(style_name).unwrap(),
            GenerationParams::new(strength, 7.5).unwrap(),
        )
    }

    #[test]
    fn test_key_covers_parameters() {
        let base = GenerationCache::key(&request(RoomType::Kitchen, "modern", 0.5), 75);
        assert_eq!(
            base,
            GenerationCache::key(&request(RoomType::Kitchen, "modern", 0.5), 75)
        );
        assert_ne!(base, GenerationCache::key(&request(RoomType::Office, "modern", 0.5), 75));
        assert_ne!(base, GenerationCache::key(&request(RoomType::Kitchen, "rustic", 0.5), 75));
        assert_ne!(base, GenerationCache::key(&request(RoomType::Kitchen, "modern", 0.6), 75));
        assert_ne!(base, GenerationCache::key(&request(RoomType::Kitchen, "modern", 0.5), 50));
    }

    #[test]
    fn test_get_and_insert() {
        let cache = GenerationCache::new(10, Duration::from_secs(60));
        assert!(cache.get("a").is_none());
        cache.insert("a".to_string(), img(1));
        assert_eq!(cache.get("a").unwrap().get_pixel(0, 0), &Rgb([1, 1, 1]));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = GenerationCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), img(1));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".to_string(), img(2));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".to_string(), img(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_ttl_expires() {
        let cache = GenerationCache::new(10, Duration::from_millis(20));
        cache.insert("a".to_string(), img(1));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = GenerationCache::new(0, Duration::from_secs(60));
        cache.insert("a".to_string(), img(1));
        assert!(cache.get("a").is_none());
    }
}
