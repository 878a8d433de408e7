//! Project-wide globals (toolbar state)

use crate::arg_types::ArgTypes;
use crate::validation;
use crate::value::Args;
use std::collections::HashSet;

/// Globals store
///
/// Only keys declared in the initial globals or in the global types can be
/// set; anything else is dropped with a warning.
#[derive(Debug, Default)]
pub struct GlobalsStore {
    allowed: HashSet<String>,
    initial: Args,
    globals: Args,
    global_types: ArgTypes,
}

impl GlobalsStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from declared globals and global types
    ///
    /// Default values of global types fill keys the globals do not set.
    pub fn set(&mut self, globals: Args, global_types: ArgTypes) {
        let mut initial: Args = global_types
            .iter()
            .filter_map(|(key, ty)| ty.default_value.clone().map(|v| (key.clone(), v)))
            .collect();
        initial.extend(globals);

        self.allowed = initial
            .keys()
            .chain(global_types.keys())
            .cloned()
            .collect();
        self.globals = initial.clone();
        self.initial = initial;
        self.global_types = global_types;
    }

    /// Current globals
    #[inline]
    #[must_use]
    pub fn get(&self) -> &Args {
        &self.globals
    }

    /// Initial globals
    #[inline]
    #[must_use]
    pub fn initial(&self) -> &Args {
        &self.initial
    }

    /// Declared global types
    #[inline]
    #[must_use]
    pub fn global_types(&self) -> &ArgTypes {
        &self.global_types
    }

    /// Shallow-merge allowed keys of `partial`
    pub fn update(&mut self, partial: &Args) -> &Args {
        let allowed = self.filter_allowed(partial);
        self.globals.extend(allowed);
        &self.globals
    }

    /// Apply persisted raw globals, coercing typed keys
    pub fn update_from_persisted(&mut self, persisted: &Args) -> &Args {
        let allowed = self.filter_allowed(persisted);
        let mut mapped = validation::map_to_declared_types(&allowed, &self.global_types);
        for (key, value) in allowed {
            if !self.global_types.contains_key(&key) {
                mapped.insert(key, value);
            }
        }
        self.globals.extend(mapped);
        &self.globals
    }

    /// Restore initial globals
    pub fn reset(&mut self) {
        self.globals = self.initial.clone();
    }

    fn filter_allowed(&self, values: &Args) -> Args {
        values
            .iter()
            .filter(|(key, _)| {
                let known = self.allowed.contains(key.as_str());
                if !known {
                    tracing::warn!(
                        global = %key,
                        "Attempted to set a global that is not defined in initial globals or global types"
                    );
                }
                known
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
