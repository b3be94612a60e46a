use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod app;
mod headless;

#[derive(Parser, Debug)]
#[command(
    name = "gigi",
    about = "Runs a Gigi render graph headlessly and prints its variables"
)]
struct Args {
    /// Render graph file (.gg JSON).
    render_graph: PathBuf,

    /// Number of frames to execute.
    #[arg(long, default_value = "1")]
    frames: u64,

    /// Override a variable before the first frame, as name=value.
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Size of an imported texture, as name=WxH or name=WxHxD.
    #[arg(long = "texture-size", value_parser = parse_texture_size)]
    texture_sizes: Vec<(String, [u32; 3])>,

    /// Element count of an imported buffer, as name=N.
    #[arg(long = "buffer-count", value_parser = parse_buffer_count)]
    buffer_counts: Vec<(String, u32)>,
}

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got \"{}\"", text))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in \"{}\"", text));
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_texture_size(text: &str) -> Result<(String, [u32; 3]), String> {
    let (name, size) = parse_assignment(text)?;

    let dimensions = size
        .split('x')
        .map(|dimension| dimension.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| format!("bad size \"{}\": {}", size, error))?;

    match dimensions[..] {
        [width, height] => Ok((name, [width, height, 1])),
        [width, height, depth] => Ok((name, [width, height, depth])),
        _ => Err(format!("expected WxH or WxHxD, got \"{}\"", size)),
    }
}

fn parse_buffer_count(text: &str) -> Result<(String, u32), String> {
    let (name, count) = parse_assignment(text)?;
    let count = count
        .trim()
        .parse()
        .map_err(|error| format!("bad count \"{}\": {}", count, error))?;
    Ok((name, count))
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("GIGI_LOG_LEVEL", "info")
        .write_style_or("GIGI_LOG_STYLE", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();

    let mut runtime = headless::HeadlessRuntime::default();
    for (name, size) in &args.texture_sizes {
        runtime = runtime.set_imported_texture(name, *size);
    }
    for (name, count) in &args.buffer_counts {
        runtime = runtime.set_imported_buffer(name, *count);
    }

    let mut gigi_app = app::GigiApp::new(&args.render_graph, runtime)?;

    for (name, value) in &args.set {
        gigi_app.set_variable(name, value)?;
    }

    for _ in 0..args.frames {
        gigi_app.render()?;
    }

    println!("After {} frame(s):", gigi_app.frame());
    for (name, data_type, value) in gigi_app.variables() {
        println!("  {} ({}) = {}", name, data_type, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Input=640x480", Some([640, 480, 1]))]
    #[case("Volume=32x32x16", Some([32, 32, 16]))]
    #[case("Input=640", None)]
    #[case("Input=640xabc", None)]
    #[case("640x480", None)]
    fn test_parse_texture_size(#[case] text: &str, #[case] expected: Option<[u32; 3]>) {
        assert_eq!(parse_texture_size(text).ok().map(|(_, size)| size), expected);
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "gigi",
            "graph.gg",
            "--frames",
            "3",
            "--set",
            "mode=Fast",
            "--set",
            "offset=1, 2",
            "--buffer-count",
            "Particles=1024",
        ])
        .unwrap();

        assert_eq!(args.frames, 3);
        assert_eq!(
            args.set,
            [
                (String::from("mode"), String::from("Fast")),
                (String::from("offset"), String::from("1, 2"))
            ]
        );
        assert_eq!(args.buffer_counts, [(String::from("Particles"), 1024)]);
        assert!(args.texture_sizes.is_empty());
    }
}
