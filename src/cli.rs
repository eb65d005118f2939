pub(crate) struct Args {
    pub port: Option<u16>,
}

pub(crate) fn parse_args() -> anyhow::Result<Args> {
    let mut pargs = pico_args::Arguments::from_env();

    match pargs.subcommand()?.as_deref() {
        Some("serve") => Ok(Args {
            port: pargs.opt_value_from_str("--port")?,
        }),
        _ => {
            anyhow::bail!("must supply 'serve'")
        }
    }
}
