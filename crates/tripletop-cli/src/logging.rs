use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "tripletop=info,tripletop_core=info";

/// Installs the global subscriber. Logs go to stderr; stdout carries the JSON summary.
///
/// `RUST_LOG` wins over `-v` when set.
pub fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(error) = installed {
        eprintln!("warning: logging not initialized: {error}");
    }
}

fn default_directives(verbose: u8) -> String {
    match verbose {
        0 => String::from(DEFAULT_DIRECTIVES),
        1 => String::from("tripletop=debug,tripletop_core=debug"),
        _ => String::from("tripletop=trace,tripletop_core=trace"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_default_level() {
        assert_eq!(default_directives(0), DEFAULT_DIRECTIVES);
        assert!(default_directives(1).contains("tripletop_core=debug"));
        assert!(default_directives(5).contains("tripletop=trace"));
    }
}
