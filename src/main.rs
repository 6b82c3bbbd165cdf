use parse_int::parse;
use seed_breaker::{Breaker, Monitor};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Error, ErrorKind, Result, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use structopt::StructOpt;

const ONE_YEAR: u32 = 31_536_000;
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

fn parse_output(line: &str) -> Result<u32> {
    parse::<u32>(line.trim()).map_err(|err| Error::new(ErrorKind::InvalidData, err))
}

fn load_observations(path: &Path, breaker: &mut Breaker) -> Result<()> {
    let file = File::open(path)
        .map_err(|err| Error::new(err.kind(), format!("{}: {}", path.display(), err)))?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        breaker.add_observed_output(parse_output(&line)?);
    }
    Ok(())
}

fn display_progress(monitor: Monitor, total: u32) {
    while !monitor.started() {
        if monitor.completed() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }

    let clock = Instant::now();
    let mut ticks = 0u32;
    let mut minutes_left = 0.0;
    while !monitor.completed() {
        let evaluated = monitor.evaluated();
        let elapsed = clock.elapsed().as_secs_f64();
        let percent = evaluated as f64 / total as f64 * 100.0;
        let rate = if elapsed > 0.0 {
            evaluated as f64 / elapsed
        } else {
            0.0
        };
        if ticks % 20 == 0 && rate > 0.0 {
            minutes_left = (total - evaluated) as f64 / rate / 60.0;
        }

        print!(
            "\r[{}] Progress: {:.2}%  [{} / {}]  ~{:.0}/sec  {:.2} minute(s)",
            SPINNER[(ticks % 4) as usize],
            percent,
            evaluated,
            total,
            rate,
            minutes_left
        );
        let _ = io::stdout().flush();

        ticks += 1;
        thread::sleep(Duration::from_millis(100));
    }
    print!("\r\x1b[K");
    let _ = io::stdout().flush();
}

fn find_seed(breaker: &mut Breaker, lower: u32, upper: u32) -> Result<()> {
    println!("[-] Looking for seed using {}", breaker.algorithm());
    println!("[-] Spawning {} worker thread(s)...", breaker.threads());

    let monitor = breaker.monitor();
    let total = upper - lower;
    let progress = thread::spawn(move || display_progress(monitor, total));

    let clock = Instant::now();
    let results = breaker.bruteforce(lower, upper);
    let _ = progress.join();
    let results = results?;

    println!("[+] Completed in {} second(s)", clock.elapsed().as_secs());
    for candidate in &results {
        println!(
            "[+] Found seed {} with a confidence of {}%",
            candidate.seed, candidate.confidence
        );
    }
    Ok(())
}

fn display_recovered_state(breaker: &Breaker) {
    let words = breaker.recovered_state().unwrap_or(&[]);
    println!(
        "[+] Recovered the internal state from {} observed output(s):",
        breaker.observed_outputs().len()
    );
    for chunk in words.chunks(8) {
        let line: Vec<String> = chunk.iter().map(|word| format!("{:08x}", word)).collect();
        println!("    {}", line.join(" "));
    }
    if let Some(upcoming) = breaker.predict(10) {
        println!("[+] Next 10 outputs:");
        for value in upcoming {
            println!("    {}", value);
        }
    }
}

fn run(args: Opt) -> Result<()> {
    let mut breaker = Breaker::new();

    if args.generate.is_none() {
        println!("{}", ASCII_HEADER);
    }

    if let Some(name) = &args.rng {
        breaker.set_algorithm(name)?;
    }
    if let Some(depth) = args.depth {
        breaker.set_depth(depth)?;
        // Sample output must stay bare integers, so no echo in generate mode.
        if args.generate.is_none() {
            println!("[-] Depth set to: {}", depth);
        }
    }
    if let Some(threads) = args.threads {
        breaker.set_threads(threads)?;
    }
    if let Some(confidence) = args.confidence {
        breaker.set_min_confidence(confidence)?;
        if args.generate.is_none() {
            println!("[-] Minimum confidence set to: {}", confidence);
        }
    }

    let mut lower = 0u32;
    let mut upper = u32::MAX;
    if args.unix_range {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| Error::new(ErrorKind::Other, err))?
            .as_secs() as u32;
        lower = now.saturating_sub(ONE_YEAR);
        upper = now.saturating_add(ONE_YEAR);
    }

    if let Some(path) = &args.input {
        load_observations(path, &mut breaker)?;
    }

    if let Some(seed) = args.generate {
        let sample = if breaker.observed_outputs().is_empty() {
            breaker.generate_sample_from_seed(seed)?
        } else {
            breaker.generate_sample_from_state()?
        };
        for value in sample {
            println!("{}", value);
        }
        return Ok(());
    }

    if breaker.observed_outputs().is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "no observed outputs provided, use -i <file>",
        ));
    }

    if let Some(descriptor) = breaker.descriptor() {
        if let Some(&value) = breaker
            .observed_outputs()
            .iter()
            .find(|&&value| value > descriptor.max_output)
        {
            println!(
                "[!] Warning: observed value {} exceeds the maximum output {} of {}",
                value, descriptor.max_output, descriptor.name
            );
        }
    }

    if breaker.infer_state() {
        display_recovered_state(&breaker);
        return Ok(());
    }

    find_seed(&mut breaker, lower, upper)
}

fn main() {
    if let Err(err) = run(Opt::from_args()) {
        eprintln!("\nfatal error: {}", err);
        process::exit(1); // report failure
    }
}

#[derive(StructOpt)]
#[structopt(
    name = "seed-breaker",
    about = "Recover PRNG seeds from observed values.",
    after_help = "Supported PRNG algorithms: mt19937 (default), glibc-rand, microsoft-rand, php-mt_rand"
)]
struct Opt {
    /// File of newline separated 32-bit integers observed from the target
    /// generator, decimal or 0x-prefixed hexadecimal (see test_input.txt)
    #[structopt(short = "i", long = "input", parse(from_os_str))]
    input: Option<PathBuf>,

    /// PRNG algorithm the target used
    #[structopt(short = "r", long = "rng")]
    rng: Option<String>,

    /// Number of outputs to inspect from each candidate seed; raise it when
    /// the target generator had already been used many times
    #[structopt(short = "d", long = "depth")]
    depth: Option<u32>,

    /// Number of worker threads
    #[structopt(short = "t", long = "threads")]
    threads: Option<usize>,

    /// Minimum confidence percentage to report
    #[structopt(short = "c", long = "confidence")]
    confidence: Option<f64>,

    /// Only bruteforce unix timestamp seeds within one year of now
    #[structopt(short = "u", long = "unix-range")]
    unix_range: bool,

    /// Generate a sample sequence from the given seed, or continue past the
    /// observed outputs when an input file is loaded
    #[structopt(short = "g", long = "generate")]
    generate: Option<u32>,
}

const ASCII_HEADER: &str = r#"
  ____  ____  ____  ____    ____  ____  ____   __   __ _  ____  ____
 / ___)(  __)(  __)(    \  (  _ \(  _ \(  __) / _\ (  / )(  __)(  _ \
 \___ \ ) _)  ) _)  ) D (   ) _ ( )   / ) _) /    \ )  (  ) _)  )   /
 (____/(____)(____)(____/  (____/(__\_)(____)\_/\_/(__\_)(____)(__\_)

              PRNG Seed Recovery & State Inference
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use seed_breaker::prng::{self, Prng};
    use std::fs;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "seed-breaker-{}-{}",
            std::process::id(),
            name
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parse_output_accepts_decimal_and_hex() {
        assert_eq!(parse_output("1103527590").unwrap(), 1103527590);
        assert_eq!(parse_output("0x41c67ea6").unwrap(), 1103527590);
        assert_eq!(parse_output("  42\t").unwrap(), 42);
        assert!(parse_output("banana").is_err());
        assert!(parse_output("-7").is_err());
    }

    #[test]
    fn load_observations_tolerates_blank_lines_and_whitespace() {
        let path = scratch_file("observations.txt", "123\n\n   \n0x10\n  456\n");
        let mut breaker = Breaker::new();
        load_observations(&path, &mut breaker).unwrap();
        assert_eq!(breaker.observed_outputs(), &[123, 16, 456]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_observations_rejects_malformed_lines() {
        let path = scratch_file("garbage.txt", "123\nbanana\n456\n");
        let mut breaker = Breaker::new();
        assert!(load_observations(&path, &mut breaker).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_observations_reports_missing_file() {
        let mut breaker = Breaker::new();
        assert!(load_observations(Path::new("/no/such/file"), &mut breaker).is_err());
    }

    // Runs the real progress thread against a small search; the join only
    // returns once display_progress has observed the completion flag.
    #[test]
    fn find_seed_drives_progress_to_completion() {
        let mut reference = prng::make("glibc-rand").unwrap();
        reference.seed(1);

        let mut breaker = Breaker::new();
        breaker.set_algorithm("glibc-rand").unwrap();
        breaker.set_depth(20).unwrap();
        for _ in 0..8 {
            breaker.add_observed_output(reference.next());
        }

        find_seed(&mut breaker, 0, 256).unwrap();
        let monitor = breaker.monitor();
        assert!(monitor.completed());
        assert_eq!(monitor.evaluated(), 256);
    }

    #[test]
    fn recovered_state_dump_does_not_disturb_the_generator() {
        let mut reference = prng::make("mt19937").unwrap();
        reference.seed(31337);

        let mut breaker = Breaker::new();
        for _ in 0..624 {
            breaker.add_observed_output(reference.next());
        }
        assert!(breaker.infer_state());

        display_recovered_state(&breaker);
        let upcoming: Vec<u32> = (0..10).map(|_| reference.next()).collect();
        assert_eq!(breaker.predict(10).unwrap(), upcoming);
    }
}
