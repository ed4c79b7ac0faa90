//! Identity and geometry decorators.
//!
//! An overridden accessor returns the profile value without touching the
//! native provider; only members the profile leaves out are delegated.

use crate::capability::{DisplayProvider, IdentityProvider};
use crate::registry::{member, OverrideRegistry, Surface};

pub struct ProfileIdentity {
    inner: Box<dyn IdentityProvider>,
    platform: Option<String>,
    hardware_concurrency: Option<u32>,
    device_memory: Option<f64>,
    max_touch_points: Option<u32>,
    language: Option<String>,
    languages: Option<Vec<String>>,
    do_not_track: Option<String>,
}

impl ProfileIdentity {
    pub fn new(inner: Box<dyn IdentityProvider>, registry: &OverrideRegistry) -> Self {
        let nav = |m| registry.value(Surface::Navigator, m);
        Self {
            inner,
            platform: nav(member::PLATFORM).and_then(|v| v.as_text()).map(String::from),
            hardware_concurrency: nav(member::HARDWARE_CONCURRENCY).and_then(|v| v.as_integer()),
            device_memory: nav(member::DEVICE_MEMORY).and_then(|v| v.as_number()),
            max_touch_points: nav(member::MAX_TOUCH_POINTS).and_then(|v| v.as_integer()),
            language: nav(member::LANGUAGE).and_then(|v| v.as_text()).map(String::from),
            languages: nav(member::LANGUAGES).and_then(|v| v.as_text_list()).map(<[String]>::to_vec),
            do_not_track: nav(member::DO_NOT_TRACK).and_then(|v| v.as_text()).map(String::from),
        }
    }
}

impl IdentityProvider for ProfileIdentity {
    fn platform(&self) -> String {
        match &self.platform {
            Some(platform) => platform.clone(),
            None => self.inner.platform(),
        }
    }

    fn hardware_concurrency(&self) -> u32 {
        self.hardware_concurrency
            .unwrap_or_else(|| self.inner.hardware_concurrency())
    }

    fn device_memory(&self) -> Option<f64> {
        match self.device_memory {
            Some(memory) => Some(memory),
            None => self.inner.device_memory(),
        }
    }

    fn max_touch_points(&self) -> u32 {
        self.max_touch_points
            .unwrap_or_else(|| self.inner.max_touch_points())
    }

    fn language(&self) -> String {
        match &self.language {
            Some(language) => language.clone(),
            None => self.inner.language(),
        }
    }

    fn languages(&self) -> Vec<String> {
        match &self.languages {
            Some(languages) => languages.clone(),
            None => self.inner.languages(),
        }
    }

    fn do_not_track(&self) -> Option<String> {
        match &self.do_not_track {
            Some(dnt) => Some(dnt.clone()),
            None => self.inner.do_not_track(),
        }
    }
}

pub struct ProfileDisplay {
    inner: Box<dyn DisplayProvider>,
    width: Option<u32>,
    height: Option<u32>,
    avail_width: Option<u32>,
    avail_height: Option<u32>,
    color_depth: Option<u32>,
    pixel_depth: Option<u32>,
    device_pixel_ratio: Option<f64>,
}

impl ProfileDisplay {
    pub fn new(inner: Box<dyn DisplayProvider>, registry: &OverrideRegistry) -> Self {
        let screen = |m| registry.value(Surface::Screen, m).and_then(|v| v.as_integer());
        Self {
            inner,
            width: screen(member::WIDTH),
            height: screen(member::HEIGHT),
            avail_width: screen(member::AVAIL_WIDTH),
            avail_height: screen(member::AVAIL_HEIGHT),
            color_depth: screen(member::COLOR_DEPTH),
            pixel_depth: screen(member::PIXEL_DEPTH),
            device_pixel_ratio: registry
                .value(Surface::Window, member::DEVICE_PIXEL_RATIO)
                .and_then(|v| v.as_number()),
        }
    }
}

impl DisplayProvider for ProfileDisplay {
    fn width(&self) -> u32 {
        self.width.unwrap_or_else(|| self.inner.width())
    }

    fn height(&self) -> u32 {
        self.height.unwrap_or_else(|| self.inner.height())
    }

    fn avail_width(&self) -> u32 {
        self.avail_width.unwrap_or_else(|| self.inner.avail_width())
    }

    fn avail_height(&self) -> u32 {
        self.avail_height.unwrap_or_else(|| self.inner.avail_height())
    }

    fn color_depth(&self) -> u32 {
        self.color_depth.unwrap_or_else(|| self.inner.color_depth())
    }

    fn pixel_depth(&self) -> u32 {
        self.pixel_depth.unwrap_or_else(|| self.inner.pixel_depth())
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
            .unwrap_or_else(|| self.inner.device_pixel_ratio())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::profile::Profile;
    use chrono::{DateTime, Utc};

    /// Native identity that counts how often it is consulted.
    struct CountingIdentity {
        reads: Rc<Cell<u32>>,
    }

    impl CountingIdentity {
        fn hit(&self) {
            self.reads.set(self.reads.get() + 1);
        }
    }

    impl IdentityProvider for CountingIdentity {
        fn platform(&self) -> String {
            self.hit();
            "Linux x86_64".into()
        }
        fn hardware_concurrency(&self) -> u32 {
            self.hit();
            16
        }
        fn device_memory(&self) -> Option<f64> {
            self.hit();
            Some(32.0)
        }
        fn max_touch_points(&self) -> u32 {
            self.hit();
            0
        }
        fn language(&self) -> String {
            self.hit();
            "nl-NL".into()
        }
        fn languages(&self) -> Vec<String> {
            self.hit();
            vec!["nl-NL".into()]
        }
        fn do_not_track(&self) -> Option<String> {
            self.hit();
            None
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    #[test]
    fn test_overridden_members_never_reach_native() {
        let reads = Rc::new(Cell::new(0));
        let profile = Profile {
            platform: Some("Win32".into()),
            hardware_concurrency: Some(4),
            device_memory: Some(8.0),
            max_touch_points: Some(0),
            language: Some("en-US,en;q=0.9".into()),
            do_not_track: Some("1".into()),
            ..Default::default()
        };
        let registry = OverrideRegistry::build(&profile, epoch());
        let identity = ProfileIdentity::new(Box::new(CountingIdentity { reads: reads.clone() }), &registry);

        assert_eq!(identity.platform(), "Win32");
        assert_eq!(identity.hardware_concurrency(), 4);
        assert_eq!(identity.device_memory(), Some(8.0));
        assert_eq!(identity.max_touch_points(), 0);
        assert_eq!(identity.language(), "en-US");
        assert_eq!(identity.languages(), vec!["en-US", "en"]);
        assert_eq!(identity.do_not_track().as_deref(), Some("1"));
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn test_unset_members_delegate() {
        let reads = Rc::new(Cell::new(0));
        let registry = OverrideRegistry::build(&Profile::default(), epoch());
        let identity = ProfileIdentity::new(Box::new(CountingIdentity { reads: reads.clone() }), &registry);

        assert_eq!(identity.platform(), "Linux x86_64");
        assert_eq!(identity.hardware_concurrency(), 16);
        assert_eq!(reads.get(), 2);
    }
}
