use clap::Parser;

/// This program tallies the hearts donated to broadcasters (BJs) and writes, for each BJ,
/// a settlement table and a display table.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. Paths inside it are relative to its
    /// directory. See the heart_tally::manual documentation for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, repeatable) A donation export (CSV or Excel). Used together with the
    /// files listed in the configuration.
    #[clap(short, long, value_parser)]
    pub input: Vec<String>,

    /// (directory, optional) If specified, the per-BJ tables are written to this directory.
    /// Overrides the outputDirectory of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) Where the summary is written in JSON format.
    /// Defaults to the standard output.
    #[clap(long, value_parser)]
    pub summary: Option<String>,

    /// (positional or fuzzy, default positional) How the columns of the per-BJ tables are found.
    #[clap(long, value_parser)]
    pub mode: Option<String>,

    /// (positional or fuzzy, default fuzzy) How the columns of the summary are found.
    #[clap(long, value_parser)]
    pub rollup_mode: Option<String>,

    /// (singleFileOnly or anyFile, default singleFileOnly) When to add the MM.DD prefix to the
    /// names of the output files.
    #[clap(long, value_parser)]
    pub prefix_policy: Option<String>,

    /// (csv or xlsx) The type of the inputs given with --input. Guessed from the extension
    /// when not given.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, bjtally checks that the
    /// computed summary matches it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// The password, required when the BJTALLY_PASSWORD environment variable is set.
    #[clap(long, value_parser)]
    pub password: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
