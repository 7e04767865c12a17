use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber once. Output goes to stderr so binaries can print
/// JSON on stdout. `RUST_LOG` filters (default `info`); `LOG_FORMAT=json` switches to
/// one JSON object per event.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,fight_forecast=info"));
        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        // Another subscriber may already be installed (tests, embedding apps).
        let _ = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    });
}
