//! High-level search tokens and the name fragments they stand for.
//!
//! The table is product data, not derived from anything: a token such as
//! `CHINA` matches any object whose name contains one of its program names.

const ALIASES: &[(&[&str], &[&str])] = &[
    (
        &["USA", "US", "AMERICA"],
        &[
            "USA ", "NAVSTAR", "GPS", "GOES", "NOAA", "DMSP", "TDRS", "LANDSAT", "WGS", "AEHF", "MUOS",
            "SBIRS", "MILSTAR", "DSP", "STARLINK", "IRIDIUM", "GLOBALSTAR", "ORBCOMM",
        ],
    ),
    (
        &["CHINA", "PRC", "CHINESE"],
        &[
            "BEIDOU", "YAOGAN", "FENGYUN", "SHIJIAN", "TIANHE", "TIANGONG", "TIANLIAN", "GAOFEN",
            "SHENZHOU", "HAIYANG", "ZIYUAN", "CHUANGXIN", "SHIYAN", "JILIN", "GUOWANG", "QIANFAN",
            "CZ-",
        ],
    ),
    (
        &["RUSSIA", "RUSSIAN", "USSR", "CIS"],
        &[
            "COSMOS", "KOSMOS", "GLONASS", "MOLNIYA", "METEOR", "RESURS", "PROGRESS", "SOYUZ",
            "GONETS", "EXPRESS", "LUCH", "ELEKTRO", "RADUGA", "GORIZONT", "SL-",
        ],
    ),
    (
        &["JAPAN", "JAXA"],
        &["QZS", "MICHIBIKI", "HIMAWARI", "ALOS", "GCOM", "GOSAT", "HTV", "IGS", "DAICHI"],
    ),
    (
        &["INDIA", "ISRO"],
        &["IRNSS", "NVS", "GSAT", "CARTOSAT", "RISAT", "RESOURCESAT", "OCEANSAT", "INSAT", "EOS-"],
    ),
    (
        &["EUROPE", "ESA", "EU"],
        &["GALILEO", "GSAT0", "SENTINEL", "METOP", "MSG", "METEOSAT", "ENVISAT", "CRYOSAT", "SWARM", "ERS-"],
    ),
    (&["SPACEX"], &["STARLINK", "FALCON", "DRAGON"]),
    (&["AMAZON"], &["KUIPER"]),
    (&["EUTELSAT"], &["ONEWEB", "EUTELSAT"]),
    (
        &["GNSS", "NAVIGATION"],
        &["NAVSTAR", "GPS", "GLONASS", "GALILEO", "BEIDOU", "IRNSS", "NVS", "QZS"],
    ),
    (
        &["WEATHER"],
        &["NOAA", "GOES", "METEOR", "METOP", "METEOSAT", "MSG", "FENGYUN", "HIMAWARI", "ELEKTRO", "DMSP"],
    ),
    (
        &["STATIONS", "STATION"],
        &["ISS", "ZARYA", "TIANHE", "TIANGONG", "WENTIAN", "MENGTIAN", "CSS"],
    ),
];

/// Name fragments for an upper-case token, if it is an alias.
pub fn lookup(token: &str) -> Option<&'static [&'static str]> {
    ALIASES
        .iter()
        .find(|(keys, _)| keys.iter().any(|key| *key == token))
        .map(|(_, fragments)| *fragments)
}
