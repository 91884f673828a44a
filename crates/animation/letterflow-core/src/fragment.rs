//! Animated fragments and the typed side-table that holds them.
//!
//! Fragment metadata (stagger ordinal, captured base transform, per-channel
//! settings) lives here keyed by [`EntityId`] instead of being attached to
//! host objects.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::scene::Scene;

/// Values below this hide a fragment when the visibility channel is enabled.
pub const VISIBILITY_THRESHOLD: f32 = 0.01;

/// Location / euler rotation / scale plus viewport visibility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub visible: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            visible: true,
        }
    }
}

impl Transform {
    pub fn at(location: [f32; 3]) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Scalar value of a channel; visibility reads as 0 or 1.
    pub fn get(&self, channel: Channel) -> f32 {
        match channel {
            Channel::LocationX => self.location[0],
            Channel::LocationY => self.location[1],
            Channel::LocationZ => self.location[2],
            Channel::RotationX => self.rotation[0],
            Channel::RotationY => self.rotation[1],
            Channel::RotationZ => self.rotation[2],
            Channel::ScaleX => self.scale[0],
            Channel::ScaleY => self.scale[1],
            Channel::ScaleZ => self.scale[2],
            Channel::Visibility => {
                if self.visible {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn set(&mut self, channel: Channel, value: ChannelValue) {
        match (channel, value) {
            (Channel::Visibility, ChannelValue::Visible(v)) => self.visible = v,
            (Channel::Visibility, ChannelValue::Scalar(v)) => self.visible = v >= 0.5,
            (_, ChannelValue::Visible(v)) => {
                self.set(channel, ChannelValue::Scalar(f32::from(u8::from(v))))
            }
            (Channel::LocationX, ChannelValue::Scalar(v)) => self.location[0] = v,
            (Channel::LocationY, ChannelValue::Scalar(v)) => self.location[1] = v,
            (Channel::LocationZ, ChannelValue::Scalar(v)) => self.location[2] = v,
            (Channel::RotationX, ChannelValue::Scalar(v)) => self.rotation[0] = v,
            (Channel::RotationY, ChannelValue::Scalar(v)) => self.rotation[1] = v,
            (Channel::RotationZ, ChannelValue::Scalar(v)) => self.rotation[2] = v,
            (Channel::ScaleX, ChannelValue::Scalar(v)) => self.scale[0] = v,
            (Channel::ScaleY, ChannelValue::Scalar(v)) => self.scale[1] = v,
            (Channel::ScaleZ, ChannelValue::Scalar(v)) => self.scale[2] = v,
        }
    }
}

/// Writable transform channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    LocationX,
    LocationY,
    LocationZ,
    RotationX,
    RotationY,
    RotationZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    Visibility,
}

impl Channel {
    pub const ALL: [Channel; 10] = [
        Channel::LocationX,
        Channel::LocationY,
        Channel::LocationZ,
        Channel::RotationX,
        Channel::RotationY,
        Channel::RotationZ,
        Channel::ScaleX,
        Channel::ScaleY,
        Channel::ScaleZ,
        Channel::Visibility,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Value written to one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChannelValue {
    Scalar(f32),
    Visible(bool),
}

/// Enable flag and amplitude multiplier for one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub enabled: bool,
    pub amplitude: f32,
}

/// Per-channel settings of a fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    settings: [ChannelSetting; 10],
}

impl Default for ChannelSettings {
    /// Location X enabled with amplitude 1; everything else off.
    fn default() -> Self {
        let off = ChannelSetting {
            enabled: false,
            amplitude: 0.0,
        };
        let mut settings = [off; 10];
        settings[Channel::LocationX.index()] = ChannelSetting {
            enabled: true,
            amplitude: 1.0,
        };
        settings[Channel::Visibility.index()].amplitude = 1.0;
        Self { settings }
    }
}

impl ChannelSettings {
    pub fn none() -> Self {
        let mut s = Self::default();
        for setting in s.settings.iter_mut() {
            setting.enabled = false;
        }
        s
    }

    #[inline]
    pub fn get(&self, channel: Channel) -> ChannelSetting {
        self.settings[channel.index()]
    }

    pub fn enable(&mut self, channel: Channel, amplitude: f32) -> &mut Self {
        self.settings[channel.index()] = ChannelSetting {
            enabled: true,
            amplitude,
        };
        self
    }

    pub fn disable(&mut self, channel: Channel) -> &mut Self {
        self.settings[channel.index()].enabled = false;
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = (Channel, ChannelSetting)> + '_ {
        Channel::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, s)| s.enabled)
    }
}

/// One animatable unit (e.g. one letter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatedFragment {
    pub entity: EntityId,
    /// Curve identity shared by all fragments of one text object.
    pub base_name: String,
    /// Stagger position.
    pub ordinal: usize,
    /// Snapshot captured on registration; animation writes never touch it.
    base: Transform,
    pub channels: ChannelSettings,
}

impl AnimatedFragment {
    pub fn new(
        entity: EntityId,
        base_name: impl Into<String>,
        ordinal: usize,
        base: Transform,
    ) -> Self {
        Self {
            entity,
            base_name: base_name.into(),
            ordinal,
            base,
            channels: ChannelSettings::default(),
        }
    }

    #[inline]
    pub fn base(&self) -> &Transform {
        &self.base
    }

    /// `base + raw * amplitude` for scalar channels, threshold test for visibility.
    pub fn channel_value(&self, channel: Channel, raw: f32) -> ChannelValue {
        match channel {
            Channel::Visibility => ChannelValue::Visible(raw >= VISIBILITY_THRESHOLD),
            _ => {
                let amplitude = self.channels.get(channel).amplitude;
                ChannelValue::Scalar(self.base.get(channel) + raw * amplitude)
            }
        }
    }
}

/// Side-table of fragments keyed by entity.
#[derive(Debug, Default)]
pub struct FragmentTable {
    rows: HashMap<EntityId, AnimatedFragment>,
}

impl FragmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fragment. The base transform of an already registered entity
    /// is kept; only ordinal and base name are refreshed.
    pub fn register(&mut self, fragment: AnimatedFragment) -> &AnimatedFragment {
        let entry = self
            .rows
            .entry(fragment.entity)
            .and_modify(|existing| {
                existing.ordinal = fragment.ordinal;
                existing.base_name.clone_from(&fragment.base_name);
            });
        entry.or_insert(fragment)
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&AnimatedFragment> {
        self.rows.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut AnimatedFragment> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<AnimatedFragment> {
        self.rows.remove(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimatedFragment> {
        self.rows.values()
    }

    /// Fragments sorted by (base name, ordinal).
    pub fn ordered(&self) -> Vec<&AnimatedFragment> {
        let mut out: Vec<&AnimatedFragment> = self.rows.values().collect();
        out.sort_by(|a, b| {
            a.base_name
                .cmp(&b.base_name)
                .then(a.ordinal.cmp(&b.ordinal))
                .then(a.entity.cmp(&b.entity))
        });
        out
    }

    /// Drop fragments whose entity the host has deleted. Returns how many went.
    pub fn retain_alive(&mut self, scene: &dyn Scene) -> usize {
        let before = self.rows.len();
        self.rows.retain(|id, _| scene.is_alive(*id));
        before - self.rows.len()
    }
}
