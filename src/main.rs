use sqbind_utf::transcode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let results = transcode(std::env::args_os().skip(1).collect());
    if results.is_err() {
        eprintln!("Usage: transcode [files]");
    }
    results.map_err(Into::into)
}
