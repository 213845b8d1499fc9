use clap::{arg,crate_version,Arg,ArgAction,ArgMatches,Command};
use huffpack::{huffman,metadata::Header,Options,STD_OPTIONS};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        if std::io::stdin().read_line(&mut ans).is_err() {
            return false;
        }
        return ans.trim_end()=="y" || ans.trim_end()=="Y";
    }
    true
}

/// accepts decimal or 0x-prefixed hex
fn parse_offset(s: &str) -> Result<u8,String> {
    let parsed = match s.strip_prefix("0x").or(s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex,16),
        None => s.parse::<u8>()
    };
    parsed.map_err(|_| format!("offset must be 0-255, got `{}`",s))
}

fn obfuscate_arg() -> Arg {
    Arg::new("obfuscate").long("obfuscate").value_name("OFFSET")
        .num_args(0..=1)
        .default_missing_value("0x55")
        .value_parser(parse_offset)
        .help("shift bytes by OFFSET, 0x55 if no value is given")
}

fn options_from(cmd: &ArgMatches,checksum: bool) -> Options {
    let mut opt = STD_OPTIONS;
    opt.obfuscation = cmd.get_one::<u8>("obfuscate").copied();
    opt.checksum = checksum;
    opt
}

fn compress(cmd: &ArgMatches) -> STDRESULT {
    let path_in = cmd.get_one::<String>("input").expect(RCH);
    let path_out = cmd.get_one::<String>("output").expect(RCH);
    let path_table = cmd.get_one::<String>("table").expect(RCH);
    let header = Header::create(
        cmd.get_one::<String>("sender").expect(RCH),
        cmd.get_one::<String>("receiver").expect(RCH)
    )?;
    if !ok_to_overwrite(path_out) || !ok_to_overwrite(path_table) {
        eprintln!("abort operation");
        return Ok(());
    }
    let opt = options_from(cmd,!cmd.get_flag("no-checksum"));
    if let Some(offset) = opt.obfuscation {
        eprintln!("obfuscating with offset 0x{:02x}",offset);
    }
    let payload = header.prepend(&std::fs::read(path_in)?);
    let compressed = huffman::compress(&payload,&opt)?;
    std::fs::write(path_out,&compressed.packed)?;
    std::fs::write(path_table,&compressed.table)?;
    let tail = &compressed.packed[compressed.packed.len().saturating_sub(16)..];
    eprintln!("weighted path length {}",compressed.wpl);
    eprintln!("compressed {} into {}",compressed.original_length,compressed.packed.len());
    eprintln!("last {} bytes: {}",tail.len(),hex::encode_upper(tail));
    eprintln!("checksum 0x{:016x}",compressed.checksum);
    Ok(())
}

fn expand(cmd: &ArgMatches) -> STDRESULT {
    let path_in = cmd.get_one::<String>("input").expect(RCH);
    let path_out = cmd.get_one::<String>("output").expect(RCH);
    let path_table = cmd.get_one::<String>("table").expect(RCH);
    let receiver = cmd.get_one::<String>("receiver");
    if !ok_to_overwrite(path_out) {
        eprintln!("abort operation");
        return Ok(());
    }
    let opt = options_from(cmd,true);
    let packed = std::fs::read(path_in)?;
    let table = std::fs::read_to_string(path_table)?;
    let expanded = huffman::expand(&packed,&table,&opt)?;
    let (header,body) = Header::split(&expanded)?;
    if let Some(receiver) = receiver {
        header.check_receiver(receiver)?;
    }
    eprintln!("sender: {}",header.sender);
    eprintln!("receiver: {}",header.receiver);
    let dat = match cmd.get_flag("keep-header") {
        true => &expanded[..],
        false => body
    };
    std::fs::write(path_out,dat)?;
    eprintln!("expanded {} into {}",packed.len(),dat.len());
    Ok(())
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `huffpack compress -i my_file -o my_packed -t my_table --sender 20230001,Alice --receiver 20230002,Bob`
Expand:        `huffpack expand -i my_packed -o my_file -t my_table --receiver 20230002,Bob`";

    let mut main_cmd = Command::new("huffpack")
        .about("Compress and expand with static Huffman codes")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-t --table <PATH> "code table path").required(true))
        .arg(arg!(--sender <IDENT> "sender as <id>,<name>").required(true))
        .arg(arg!(--receiver <IDENT> "receiver as <id>,<name>").required(true))
        .arg(obfuscate_arg())
        .arg(Arg::new("no-checksum").long("no-checksum").action(ArgAction::SetTrue)
            .help("do not write the checksum into the code table"))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-t --table <PATH> "code table path").required(true))
        .arg(arg!(--receiver <IDENT> "expected receiver").required(false))
        .arg(obfuscate_arg())
        .arg(Arg::new("keep-header").long("keep-header").action(ArgAction::SetTrue)
            .help("keep the sender/receiver header in the output"))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        compress(cmd)?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        expand(cmd)?;
    }

    Ok(())
}
