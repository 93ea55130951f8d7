/// Change detector for a resource's fetch dependencies (filters, sort, parent id).
///
/// `update` reports a change only when the dependencies differ from the last
/// ones seen, so re-applying identical filters does not trigger a refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchKey<D> {
    deps: Option<D>,
    generation: u64,
}

impl<D> Default for FetchKey<D> {
    fn default() -> Self {
        Self { deps: None, generation: 0 }
    }
}

impl<D: PartialEq + Clone> FetchKey<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `deps`. Returns `true` if they differ from the previous value.
    pub fn update(&mut self, deps: &D) -> bool {
        if self.deps.as_ref() == Some(deps) {
            return false;
        }
        self.deps = Some(deps.clone());
        self.generation += 1;
        true
    }

    /// Incremented on every change; a fetch started under an older
    /// generation is stale.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn current(&self) -> Option<&D> {
        self.deps.as_ref()
    }
}
