fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                eprintln!(
                    "xfer-testserver\n\nUSAGE:\n  xfer-testserver\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready, then serves until interrupted."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let server = xfer_testserver::TestServer::start()?;
    println!("HTTP_URL={}", server.base_url());

    // Serve until interrupted; dropping the server shuts it down.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let _ = tokio::signal::ctrl_c().await;
    });
    drop(server);
    Ok(())
}
