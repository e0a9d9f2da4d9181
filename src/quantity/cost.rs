quantity!(Cost, suffix: "$", precision: 2);

impl Cost {
    /// Round the cost to [mills][1].
    ///
    /// [1]: https://en.wikipedia.org/wiki/Mill_(currency)
    pub fn round_to_mills(self) -> Self {
        Self((self.0 * 1000.0).round() / 1000.0)
    }
}
