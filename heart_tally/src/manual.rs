/*!

This is the long-form manual for `heart_tally` and `bjtally`.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, as exported by the broadcasting platform
* `xlsx` Excel workbooks

The provider is guessed from the file extension when it is not given.

### `csv`

The first row holds the headers. The file is decoded with the first encoding that works,
in this order: UTF-8 with a byte order mark, UTF-8, CP949, EUC-KR. If none works, the
content is read as UTF-8 and invalid bytes are replaced.

```text
후원시간,후원아이디(닉네임),후원하트,참여BJ
2024-01-01 10:00:00,a@ka(Kim),100,BJ1
2024-01-01 10:05:00,b@x(Lee),50,BJ1
```

### `xlsx`

The first worksheet is used, unless `excelWorksheetName` is given. The first row holds
the headers. Dates stored as Excel dates are understood as event times.

## Columns

Four roles are needed: the time of the donation, the donor identity (`ID` or
`ID(NICKNAME)`), the number of hearts and the participating BJ.

* `positional`: the first four columns are, in order, time, identity, hearts and BJ.
* `fuzzy`: each role is the first column whose header contains all of a list of fragments.
  The defaults are:

| role     | fragments        |
|----------|------------------|
| time     | `후원`, `시간`   |
| identity | `후원`, `아이디` |
| amount   | `후원`, `하트`   |
| group    | `참여`, `BJ`     |

The time column is optional in fuzzy mode. The per-donor tables and the summary table
each have their own mode (by default: positional for the tables, fuzzy for the summary).
When the columns of one of them cannot be found, it is skipped with a warning and the
other one is still computed.

## Categories

Hearts are either standard (`일반`) or partner (`제휴`) hearts, decided on the donor id:
an id containing `@ka` is standard, otherwise an id containing `@` is partner, and
everything else is standard.

## Outputs

For each BJ, two tables are written:
* `정산용` (settlement): standard donors first, then partner donors, each by decreasing hearts.
* `BJ용` (display): all donors by decreasing hearts.

A donor who used several nicknames appears once, under the nickname with the most hearts
(the first one seen in case of a tie). Files are named `MM.DD_<BJ>_<view>.csv`. The date
comes from a leading `MM.DD` in the input file name, or else from the earliest donation
time. By default (`prefixPolicy: singleFileOnly`) the date is only added when a single
file is given; `anyFile` derives it whatever the number of files.

The summary (hearts by BJ and category, and the content of every table) is written in
JSON to the summary path, or printed when it is `stdout`.

## Configuration

```json
{
  "outputSettings": {
    "outputDirectory": "out",
    "prefixPolicy": "singleFileOnly",
    "summaryPath": "stdout"
  },
  "inputFiles": [
    { "filePath": "01.01 hearts.csv", "provider": "csv" }
  ],
  "columns": {
    "aggregationMode": "positional",
    "rollupMode": "fuzzy",
    "roles": {
      "time": ["후원", "시간"],
      "identity": ["후원", "아이디"],
      "amount": ["후원", "하트"],
      "group": ["참여", "BJ"]
    }
  }
}
```

Only `inputFiles` is mandatory. File paths are relative to the configuration file.
All the options can also be given on the command line, see `bjtally --help`.

 */
