use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Collects logging settings while the host is built.
///
/// `RUST_LOG`, when set, replaces the level and directives configured here.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: LevelFilter,
    directives: Vec<String>,
    ansi: bool,
    with_time: bool,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        LoggingBuilder {
            level: LevelFilter::INFO,
            directives: Vec::new(),
            ansi: true,
            with_time: true,
            with_target: true,
        }
    }
}

impl LoggingBuilder {
    pub fn set_minimum_level(&mut self, level: LevelFilter) -> &mut Self {
        self.level = level;
        self
    }

    /// Adds a filter directive, e.g. `hostbridge_core=debug`
    pub fn add_directive(&mut self, directive: impl Into<String>) -> &mut Self {
        self.directives.push(directive.into());
        self
    }

    pub fn with_ansi(&mut self, ansi: bool) -> &mut Self {
        self.ansi = ansi;
        self
    }

    pub fn without_time(&mut self) -> &mut Self {
        self.with_time = false;
        self
    }

    pub fn with_target(&mut self, with_target: bool) -> &mut Self {
        self.with_target = with_target;
        self
    }

    /// The filter that [install](LoggingBuilder::install) uses
    pub fn env_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }

        let mut filter = EnvFilter::default().add_directive(self.level.into());
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => eprintln!("Ignoring invalid log directive '{directive}': {e}"),
            }
        }
        filter
    }

    /// Installs a `fmt` subscriber as the global default.
    ///
    /// An already installed global subscriber is left in place.
    pub fn install(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_ansi(self.ansi)
            .with_target(self.with_target);

        let installed = match self.with_time {
            true => builder.try_init(),
            false => builder.without_time().try_init(),
        };
        if installed.is_err() {
            tracing::debug!("A global subscriber is already installed, keeping it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_added_to_the_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }

        let mut builder = LoggingBuilder::default();
        builder
            .set_minimum_level(LevelFilter::WARN)
            .add_directive("hostbridge_core=debug");

        let filter = builder.env_filter().to_string();
        assert!(filter.contains("hostbridge_core=debug"));
        assert!(filter.contains("warn"));
    }
}
