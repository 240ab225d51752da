//! Kernel name tables for the two supported languages.

/// Kernel assumed when nothing else is known.
pub const DEFAULT_KERNEL: &str = "python";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Python,
    R,
}

impl Kernel {
    pub const ALL: [Kernel; 2] = [Kernel::Python, Kernel::R];

    /// Value used in the `kernel=` page parameter.
    pub fn url_param(self) -> &'static str {
        match self {
            Kernel::Python => "python",
            Kernel::R => "r",
        }
    }

    pub fn kernel_name(self) -> &'static str {
        match self {
            Kernel::Python => "xpython",
            Kernel::R => "xr",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Kernel::Python => "Python",
            Kernel::R => "R",
        }
    }

    pub fn from_url_param(param: &str) -> Option<Kernel> {
        Self::ALL.into_iter().find(|k| k.url_param() == param)
    }

    pub fn from_kernel_name(name: &str) -> Option<Kernel> {
        Self::ALL.into_iter().find(|k| k.kernel_name() == name)
    }
}

/// Kernel to start a blank notebook with, given the optional `kernel=` parameter.
///
/// Unknown or missing values fall back to the stock `python` kernel.
pub fn kernel_for_new_notebook(param: Option<&str>) -> &'static str {
    param
        .and_then(Kernel::from_url_param)
        .map(Kernel::kernel_name)
        .unwrap_or(DEFAULT_KERNEL)
}
