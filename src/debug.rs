impl std::fmt::Debug for crate::State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("date", &self.date)
            .field("time_slice", &self.terrain.time_slice())
            .field("active", &self.active_cells())
            .field("population", &self.total_population())
            .field("K", &self.capacity)
            .finish()
    }
}

impl std::fmt::Debug for crate::observation::TimeSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSlice")
            .field("date", &self.date())
            .field("occupied", &self.occupied().count_ones())
            .finish()
    }
}

impl std::fmt::Debug for crate::ActiveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.cells().iter().filter(|&&c| self.contains(c))).finish()
    }
}
