use serde::{Deserialize, Serialize};
use std::fmt;

/// A UI surface with its own refresh step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Doctor,
    Lifestyle,
    Chart,
}

impl Surface {
    /// Execution order within a pass.
    pub const ORDER: [Surface; 3] = [Surface::Doctor, Surface::Lifestyle, Surface::Chart];

    pub fn name(&self) -> &'static str {
        match self {
            Surface::Doctor => "doctor",
            Surface::Lifestyle => "lifestyle",
            Surface::Chart => "chart",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which surfaces need a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshFlags {
    #[serde(default)]
    pub doctor: bool,
    #[serde(default)]
    pub lifestyle: bool,
    #[serde(default)]
    pub chart: bool,
}

impl RefreshFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            doctor: true,
            lifestyle: true,
            chart: true,
        }
    }

    pub fn only(surface: Surface) -> Self {
        Self::none().with(surface)
    }

    pub fn with(mut self, surface: Surface) -> Self {
        *self.flag_mut(surface) = true;
        self
    }

    pub fn contains(&self, surface: Surface) -> bool {
        match surface {
            Surface::Doctor => self.doctor,
            Surface::Lifestyle => self.lifestyle,
            Surface::Chart => self.chart,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.doctor || self.lifestyle || self.chart)
    }

    /// OR `other` into `self`. Flags are never cleared by merging.
    pub fn merge(&mut self, other: RefreshFlags) {
        self.doctor |= other.doctor;
        self.lifestyle |= other.lifestyle;
        self.chart |= other.chart;
    }

    /// Set surfaces, in [`Surface::ORDER`].
    pub fn surfaces(&self) -> impl Iterator<Item = Surface> + '_ {
        Surface::ORDER.into_iter().filter(|s| self.contains(*s))
    }

    fn flag_mut(&mut self, surface: Surface) -> &mut bool {
        match surface {
            Surface::Doctor => &mut self.doctor,
            Surface::Lifestyle => &mut self.lifestyle,
            Surface::Chart => &mut self.chart,
        }
    }
}

impl FromIterator<Surface> for RefreshFlags {
    fn from_iter<I: IntoIterator<Item = Surface>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), |flags, s| flags.with(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_or() {
        let mut flags = RefreshFlags::only(Surface::Doctor);
        flags.merge(RefreshFlags::only(Surface::Chart));
        flags.merge(RefreshFlags::none());
        assert!(flags.doctor && flags.chart && !flags.lifestyle);
    }

    #[test]
    fn test_surfaces_follow_fixed_order() {
        let flags: RefreshFlags = [Surface::Chart, Surface::Doctor, Surface::Lifestyle]
            .into_iter()
            .collect();
        let order: Vec<Surface> = flags.surfaces().collect();
        assert_eq!(order, Surface::ORDER.to_vec());
    }

    #[test]
    fn test_empty() {
        assert!(RefreshFlags::none().is_empty());
        assert!(!RefreshFlags::only(Surface::Lifestyle).is_empty());
        assert_eq!(RefreshFlags::all().surfaces().count(), 3);
    }
}
