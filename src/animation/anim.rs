use crate::{
    animation::ease::Ease,
    foundation::core::Vec2,
    foundation::error::{RenderError, RenderResult},
};

/// Linear interpolation between two values of the same type.
pub trait Lerp: Sized {
    /// Interpolate from `a` (t = 0) to `b` (t = 1).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

/// A value that may change over absolute frame time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Anim<T> {
    /// Same value on every frame.
    Constant(T),
    /// Keyframed value.
    Keyframes(Keyframes<T>),
}

impl<T> Anim<T>
where
    T: Lerp + Clone,
{
    /// A value that never changes.
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Sample at an absolute frame.
    pub fn sample(&self, frame: u64) -> RenderResult<T> {
        match self {
            Self::Constant(v) => Ok(v.clone()),
            Self::Keyframes(kf) => kf.sample(frame),
        }
    }

    /// Check that the value can be sampled on every frame.
    pub fn validate(&self) -> RenderResult<()> {
        match self {
            Self::Constant(_) => Ok(()),
            Self::Keyframes(kf) => kf.validate(),
        }
    }
}

/// Keyframes sorted by frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframes<T> {
    /// Keys in ascending frame order.
    pub keys: Vec<Keyframe<T>>,
    /// Interpolation between consecutive keys.
    #[serde(default)]
    pub mode: InterpMode,
}

impl<T> Keyframes<T>
where
    T: Lerp + Clone,
{
    fn validate(&self) -> RenderResult<()> {
        if self.keys.is_empty() {
            return Err(RenderError::animation("keyframes must have at least one key"));
        }
        if !self.keys.windows(2).all(|w| w[0].frame <= w[1].frame) {
            return Err(RenderError::animation("keyframes must be sorted by frame"));
        }
        Ok(())
    }

    fn sample(&self, frame: u64) -> RenderResult<T> {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return Err(RenderError::animation("keyframes has no keys"));
        };

        let idx = self.keys.partition_point(|k| k.frame <= frame);
        if idx == 0 {
            return Ok(first.value.clone());
        }
        if idx >= self.keys.len() {
            return Ok(last.value.clone());
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.frame - a.frame;
        if span == 0 || self.mode == InterpMode::Hold {
            return Ok(a.value.clone());
        }

        let t = ((frame - a.frame) as f64) / (span as f64);
        Ok(T::lerp(&a.value, &b.value, a.ease.apply(t)))
    }
}

/// One keyframe.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    /// Absolute frame of this key.
    pub frame: u64,
    /// Value at `frame`.
    pub value: T,
    /// Ease applied toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

/// How values move between keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMode {
    /// Jump at the next key.
    Hold,
    /// Interpolate, shaped by each key's ease.
    #[default]
    Linear,
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
