use crate::tally::*;

use serde::{Deserialize, Serialize};

/// The value of a summary path that prints to the standard output.
pub const STDOUT: &str = "stdout";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "prefixPolicy")]
    pub prefix_policy: Option<String>,
    #[serde(rename = "summaryPath")]
    pub summary_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleSettings {
    pub time: Option<Vec<String>>,
    pub identity: Option<Vec<String>>,
    pub amount: Option<Vec<String>>,
    pub group: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSettings {
    #[serde(rename = "aggregationMode")]
    pub aggregation_mode: Option<String>,
    #[serde(rename = "rollupMode")]
    pub rollup_mode: Option<String>,
    pub roles: Option<RoleSettings>,
}

impl ColumnSettings {
    /// The header fragments for each role. Roles that are not configured
    /// keep the fragments of the platform export.
    pub fn role_table(&self) -> RoleTable {
        let mut table = RoleTable::legacy();
        if let Some(roles) = &self.roles {
            if let Some(x) = &roles.time {
                table.time = x.clone();
            }
            if let Some(x) = &roles.identity {
                table.identity = x.clone();
            }
            if let Some(x) = &roles.amount {
                table.amount = x.clone();
            }
            if let Some(x) = &roles.group {
                table.group = x.clone();
            }
        }
        table
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "inputFiles")]
    pub input_files: Vec<FileSource>,
    #[serde(default)]
    pub columns: ColumnSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Xlsx,
}

/// When the `MM.DD` prefix of the output files is derived.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PrefixPolicy {
    /// Only when exactly one input file is given.
    SingleFileOnly,
    /// Whatever the number of input files.
    AnyFile,
}

/// An input file, checked and ready to be read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InputFile {
    pub path: String,
    pub provider: Provider,
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// The reader to use: the one given explicitly, or else the one matching
    /// the file extension.
    pub fn provider(&self) -> TallyResult<Provider> {
        let p = match &self.provider {
            Some(p) => p.to_lowercase(),
            None => Path::new(self.file_path.as_str())
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        };
        match p.as_str() {
            "csv" => Ok(Provider::Csv),
            "xlsx" | "xlsm" | "excel" => Ok(Provider::Xlsx),
            _ => UnknownProviderSnafu {
                provider: p,
                path: self.file_path.clone(),
            }
            .fail(),
        }
    }

    pub fn validate(&self, full_path: &str) -> TallyResult<InputFile> {
        Ok(InputFile {
            path: full_path.to_string(),
            provider: self.provider()?,
            excel_worksheet_name: self.excel_worksheet_name.clone(),
        })
    }
}

pub fn parse_mode(s: &str) -> TallyResult<ResolveMode> {
    match s {
        "positional" => Ok(ResolveMode::Positional),
        "fuzzy" | "fuzzyName" => Ok(ResolveMode::FuzzyName),
        _ => UnknownModeSnafu { mode: s }.fail(),
    }
}

pub fn parse_prefix_policy(s: &str) -> TallyResult<PrefixPolicy> {
    match s {
        "singleFileOnly" => Ok(PrefixPolicy::SingleFileOnly),
        "anyFile" => Ok(PrefixPolicy::AnyFile),
        _ => UnknownPrefixPolicySnafu { policy: s }.fail(),
    }
}

pub fn read_config(path: &str) -> TallyResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, provider: Option<&str>) -> FileSource {
        FileSource {
            provider: provider.map(|s| s.to_string()),
            file_path: path.to_string(),
            excel_worksheet_name: None,
        }
    }

    #[test]
    fn providers() {
        assert_eq!(source("a.csv", None).provider().unwrap(), Provider::Csv);
        assert_eq!(source("a.XLSX", None).provider().unwrap(), Provider::Xlsx);
        assert_eq!(
            source("a.txt", Some("csv")).provider().unwrap(),
            Provider::Csv
        );
        assert!(source("a.txt", None).provider().is_err());
        assert!(source("noext", None).provider().is_err());
    }

    #[test]
    fn modes_and_policies() {
        assert_eq!(parse_mode("positional").unwrap(), ResolveMode::Positional);
        assert_eq!(parse_mode("fuzzy").unwrap(), ResolveMode::FuzzyName);
        assert!(parse_mode("magic").is_err());
        assert_eq!(
            parse_prefix_policy("anyFile").unwrap(),
            PrefixPolicy::AnyFile
        );
        assert!(parse_prefix_policy("always").is_err());
    }

    #[test]
    fn minimal_config() {
        let config: TallyConfig =
            serde_json::from_str(r#"{"inputFiles": [{"filePath": "a.xlsx"}]}"#).unwrap();
        assert_eq!(config.input_files.len(), 1);
        assert_eq!(config.output_settings, OutputSettings::default());
        assert_eq!(config.columns.role_table(), RoleTable::legacy());
    }
}
