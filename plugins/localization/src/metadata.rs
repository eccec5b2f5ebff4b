//! Fixed menu metadata of the localization microscopy plugin

/// Display name of the menu entry
pub const MENU_NAME: &str = "Localization Microscopy";

/// Submenu the entry lives under
pub const SUB_MENU: &str = "Acquisition Tools";

pub const TOOLTIP_DESCRIPTION: &str = "Toolbox for analyzing spots using Gaussian fitting";

pub const HELP_TEXT: &str = "Gaussian Fitting Plugin";

pub const VERSION: &str = "0.32";

pub const COPYRIGHT: &str = "University of California, 2010-2014";
