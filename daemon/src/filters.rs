use common::FilterChannel;

pub const FILTER_MIN: i32 = 0;
pub const FILTER_MAX: i32 = 200;
pub const FILTER_DEFAULT: i32 = 100;

/// Brightness/contrast/saturation as percentages.
///
/// Always defined, whatever the active source; only applied to the direct
/// media surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualFilter {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

impl Default for VisualFilter {
    fn default() -> Self {
        Self {
            brightness: FILTER_DEFAULT,
            contrast: FILTER_DEFAULT,
            saturation: FILTER_DEFAULT,
        }
    }
}

impl VisualFilter {
    /// Set a channel, clamped to 0-200. Returns true if the value changed.
    pub fn set(&mut self, channel: FilterChannel, value: i32) -> bool {
        let value = value.clamp(FILTER_MIN, FILTER_MAX);
        let slot = self.slot(channel);
        let changed = *slot != value;
        *slot = value;
        changed
    }

    /// Put a channel back to 100. Returns true if the value changed.
    pub fn reset(&mut self, channel: FilterChannel) -> bool {
        self.set(channel, FILTER_DEFAULT)
    }

    pub fn get(&self, channel: FilterChannel) -> i32 {
        match channel {
            FilterChannel::Brightness => self.brightness,
            FilterChannel::Contrast => self.contrast,
            FilterChannel::Saturation => self.saturation,
        }
    }

    fn slot(&mut self, channel: FilterChannel) -> &mut i32 {
        match channel {
            FilterChannel::Brightness => &mut self.brightness,
            FilterChannel::Contrast => &mut self.contrast,
            FilterChannel::Saturation => &mut self.saturation,
        }
    }

    /// Combined effect as a CSS filter list
    pub fn effect(&self) -> String {
        FilterChannel::ALL
            .iter()
            .map(|c| format!("{}({}%)", c.css_function(), self.get(*c)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filter = VisualFilter::default();
        assert_eq!(filter.get(FilterChannel::Contrast), 100);
        assert_eq!(
            filter.effect(),
            "brightness(100%) contrast(100%) saturate(100%)"
        );
    }

    #[test]
    fn test_set_clamps() {
        let mut filter = VisualFilter::default();
        assert!(filter.set(FilterChannel::Brightness, 250));
        assert_eq!(filter.brightness, 200);
        assert!(filter.set(FilterChannel::Contrast, -5));
        assert_eq!(filter.contrast, 0);
        assert!(!filter.set(FilterChannel::Contrast, 0));
        assert_eq!(
            filter.effect(),
            "brightness(200%) contrast(0%) saturate(100%)"
        );
    }

    #[test]
    fn test_reset_single_channel() {
        let mut filter = VisualFilter::default();
        filter.set(FilterChannel::Saturation, 40);
        filter.set(FilterChannel::Brightness, 150);

        assert!(filter.reset(FilterChannel::Saturation));
        assert_eq!(filter.saturation, 100);
        assert_eq!(filter.brightness, 150);
        assert!(!filter.reset(FilterChannel::Saturation));
    }
}
