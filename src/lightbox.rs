use crate::media::{MediaItem, MediaKind};

/// Stand-in for the media element behind the lightbox. Only video items are loaded into it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Player {
    pub source: Option<String>,
    pub playing: bool,
}

impl Player {
    fn load(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.playing = true;
    }

    /// Pauses and drops the source so the underlying stream is released.
    pub fn stop(&mut self) {
        self.playing = false;
        self.source = None;
    }
}

/// What the lightbox is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub struct LightboxView<'a> {
    pub item: &'a MediaItem,
    pub kind: MediaKind,
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct Lightbox {
    items: Vec<MediaItem>,
    cursor: usize,
    open: bool,
    player: Player,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Replaces the working set. The cursor is reset when it would fall outside the new list.
    pub fn set_items(&mut self, items: Vec<MediaItem>) {
        self.items = items;
        if self.items.is_empty() {
            self.cursor = 0;
            if self.open {
                self.close();
            }
            return;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
        if self.open {
            self.show_current();
        }
    }

    /// Returns false (and stays closed) when `index` is out of range.
    pub fn open_index(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.cursor = index;
        self.open = true;
        self.show_current();
        true
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.items.len();
        self.show_current();
    }

    pub fn prev(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.items.len() - 1
        } else {
            self.cursor - 1
        };
        self.show_current();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.player.stop();
    }

    pub fn current(&self) -> Option<LightboxView<'_>> {
        let item = self.items.get(self.cursor)?;
        Some(LightboxView {
            item,
            kind: item.kind(),
            position: self.cursor + 1,
            total: self.items.len(),
        })
    }

    fn show_current(&mut self) {
        let Some(item) = self.items.get(self.cursor) else {
            return;
        };
        match item.kind() {
            MediaKind::Video => {
                let url = item.url.clone();
                self.player.load(&url);
            }
            MediaKind::Image => self.player.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<MediaItem> {
        names
            .iter()
            .map(|n| MediaItem::new(&format!("uid/Trip/{}", n), None, &format!("https://cdn/{}", n)))
            .collect()
    }

    #[test]
    fn test_next_wraps_to_start() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "b.jpg", "c.jpg"]));
        assert!(lb.open_index(2));
        lb.next();
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_prev_wraps_to_end() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "b.jpg", "c.jpg"]));
        assert!(lb.open_index(0));
        lb.prev();
        assert_eq!(lb.cursor(), 2);
    }

    #[test]
    fn test_cursor_stays_in_range_for_any_walk() {
        for n in 1..6usize {
            let names: Vec<String> = (0..n).map(|i| format!("{}.jpg", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut lb = Lightbox::new();
            lb.set_items(items(&refs));
            lb.open_index(0);

            // Deterministic pseudo-random walk.
            let mut seed: u32 = 7 + n as u32;
            let mut expected: i64 = 0;
            for _ in 0..200 {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                if seed & 0x100 == 0 {
                    lb.next();
                    expected += 1;
                } else {
                    lb.prev();
                    expected -= 1;
                }
                assert!(lb.cursor() < n);
                assert_eq!(lb.cursor() as i64, expected.rem_euclid(n as i64));
            }
        }
    }

    #[test]
    fn test_navigation_on_empty_list_is_noop() {
        let mut lb = Lightbox::new();
        lb.next();
        lb.prev();
        assert_eq!(lb.cursor(), 0);
        assert!(lb.current().is_none());
        assert!(!lb.open_index(0));
        assert!(!lb.is_open());
    }

    #[test]
    fn test_video_loads_player_and_close_releases_it() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "clip.mp4"]));
        lb.open_index(1);
        assert_eq!(lb.current().unwrap().kind, MediaKind::Video);
        assert!(lb.player().playing);
        assert_eq!(lb.player().source.as_deref(), Some("https://cdn/clip.mp4"));

        lb.close();
        assert!(!lb.is_open());
        assert!(!lb.player().playing);
        assert!(lb.player().source.is_none());
    }

    #[test]
    fn test_moving_to_image_stops_video() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "clip.mp4"]));
        lb.open_index(1);
        lb.next();
        assert_eq!(lb.current().unwrap().kind, MediaKind::Image);
        assert!(lb.player().source.is_none());
    }

    #[test]
    fn test_set_items_keeps_cursor_valid() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "b.jpg", "c.jpg"]));
        lb.open_index(2);
        lb.set_items(items(&["a.jpg"]));
        assert_eq!(lb.cursor(), 0);
        assert!(lb.is_open());

        lb.set_items(Vec::new());
        assert!(!lb.is_open());
        assert!(lb.current().is_none());
    }

    #[test]
    fn test_current_reports_position() {
        let mut lb = Lightbox::new();
        lb.set_items(items(&["a.jpg", "b.jpg"]));
        lb.open_index(1);
        let view = lb.current().unwrap();
        assert_eq!(view.position, 2);
        assert_eq!(view.total, 2);
        assert_eq!(view.item.display_name(), "b.jpg");
    }
}
