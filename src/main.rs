use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;

use tinta::Options;

mod cli;
use cli::Cli;

fn read_all(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut builder = Options::builder()
        .pedantic(cli.pedantic)
        .gfm(!cli.no_gfm)
        .breaks(cli.breaks)
        .sanitize(cli.sanitize)
        .smartypants(cli.smartypants)
        .smart_lists(cli.smart_lists)
        .xhtml(cli.xhtml)
        .silent(cli.silent);
    if let Some(seed) = cli.mangle_seed {
        builder = builder.mangle_seed(seed);
    }
    let options = builder.build();

    let input = read_all(cli.file.as_ref())?;

    let html = match tinta::render_with(&input, &options) {
        Ok(html) => html,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    match &cli.output {
        Some(path) => fs::write(path, &html)?,
        None => io::stdout().write_all(html.as_bytes())?,
    }

    Ok(())
}
