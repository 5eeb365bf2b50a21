//! [`Court`] read model definition.
//!
//! [`Court`]: crate::domain::Court

pub mod list {
    //! [`Court`]s list definitions.

    use crate::domain::{court, Court};

    /// Filter of [`Court`]s in a list.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// Whether to omit deactivated [`Court`]s.
        pub only_active: bool,

        /// [`court::Sport`] to list [`Court`]s of, if any.
        pub sport: Option<court::Sport>,
    }

    impl Filter {
        /// Checks whether the provided [`Court`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, court: &Court) -> bool {
            (!self.only_active || court.is_active)
                && self.sport.map_or(true, |s| s == court.sport)
        }
    }
}
