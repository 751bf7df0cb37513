//! Viewport-driven widget layout.

/// Panel size on wide viewports, or the full-screen mobile layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Narrow viewport; chat and lead form are alternative panes.
    Mobile,
    /// Fixed-width side panel.
    Compact,
    /// Wide centred panel.
    Expanded,
}

/// Which pane a mobile layout shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Chat,
    Lead,
}

impl Layout {
    /// Layout for a viewport width, resetting wide viewports to compact.
    #[must_use]
    pub fn for_width(width: u32, mobile_breakpoint: u32) -> Self {
        if width < mobile_breakpoint {
            Self::Mobile
        } else {
            Self::Compact
        }
    }

    /// Flip between compact and expanded. Mobile has no size toggle.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Mobile => Self::Mobile,
            Self::Compact => Self::Expanded,
            Self::Expanded => Self::Compact,
        }
    }

    #[must_use]
    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }
}

impl Pane {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Chat => Self::Lead,
            Self::Lead => Self::Chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint() {
        assert_eq!(Layout::for_width(785, 786), Layout::Mobile);
        assert_eq!(Layout::for_width(786, 786), Layout::Compact);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(Layout::Compact.toggled(), Layout::Expanded);
        assert_eq!(Layout::Expanded.toggled(), Layout::Compact);
        assert_eq!(Layout::Mobile.toggled(), Layout::Mobile);
    }
}
