//! The application the running process belongs to.
//!
//! A process that wants to update itself binds its own [`AppDescriptor`] exactly once,
//! while building an [`AppContext`], and passes the context to whatever needs it. There is
//! no process-wide mutable state; a second binding is rejected by the builder.
//!
//! # Examples
//!
//! ```rust,no_run
//! use semver::Version;
//! use updraft::context::AppContext;
//! use updraft::models::AppDescriptor;
//!
//! # fn example() -> anyhow::Result<()> {
//! let me = AppDescriptor::builder("Foo", "https://downloads.example.test/foo")
//!     .installed_version(Version::new(1, 0, 0))
//!     .build()?;
//! let context = AppContext::builder().current(me)?.build()?;
//! println!("Installed under {}", context.layout().root().display());
//! # Ok(())
//! # }
//! ```

use crate::core::UpdateError;
use crate::layout::Layout;
use crate::models::AppDescriptor;
use anyhow::Result;

/// The bound current application and the layout it lives in.
#[derive(Debug, Clone)]
pub struct AppContext {
    current: AppDescriptor,
    layout: Layout,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// The application this process belongs to.
    pub fn current(&self) -> &AppDescriptor {
        &self.current
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// Builder for [`AppContext`].
#[derive(Debug, Default)]
pub struct AppContextBuilder {
    current: Option<AppDescriptor>,
    layout: Option<Layout>,
}

impl AppContextBuilder {
    /// Bind the current application.
    ///
    /// # Errors
    ///
    /// [`UpdateError::CurrentAlreadyBound`] when an application is already bound.
    pub fn current(mut self, app: AppDescriptor) -> Result<Self> {
        if let Some(existing) = &self.current {
            return Err(UpdateError::CurrentAlreadyBound {
                name: existing.name().to_string(),
            }
            .into());
        }
        self.current = Some(app);
        Ok(self)
    }

    /// Use an explicit layout instead of deriving one from the running executable.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// # Errors
    ///
    /// [`UpdateError::CurrentNotBound`] when no application was bound, or the layout
    /// derivation error when no layout was given and the executable is misplaced.
    pub fn build(self) -> Result<AppContext> {
        let current = self.current.ok_or(UpdateError::CurrentNotBound)?;
        let layout = match self.layout {
            Some(layout) => layout,
            None => Layout::from_current_exe(&current)?,
        };
        Ok(AppContext {
            current,
            layout,
        })
    }
}
