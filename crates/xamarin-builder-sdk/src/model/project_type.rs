//! Project type identification from MSBuild `ProjectTypeGuids`.

use crate::types::ProjectType;

/// Type GUIDs marking a Xamarin.Android project.
pub const ANDROID_GUIDS: &[&str] = &[
    "EFBA0AD7-5A72-4C68-AF49-83D382785DCF",
    "10368E6C-D01B-4462-8E8B-01FC667A7035",
];

/// Type GUIDs marking a Xamarin.iOS project (unified and classic API).
pub const IOS_GUIDS: &[&str] = &[
    "E613F3A2-FE9C-494F-B74E-F63BCB86FEA6",
    "6BC8ED88-2882-458C-8E55-DFD12B67127B",
    "F5B4F3BC-B597-4E2B-B552-EF5D8A32436F",
    "FEACFBD2-3405-455C-9665-78FE426C6842",
    "8FFB629D-F513-41CE-95D2-7ECE97B6EEEC",
    "EE2C853D-36AF-4FDB-B1AD-8E90477E2198",
];

/// Type GUIDs marking a MonoMac project.
pub const MONO_MAC_GUIDS: &[&str] = &[
    "1C533B1C-72DD-4CB1-9F6B-BF11D93BCFBE",
    "948B3504-5B70-4649-8FE4-BDE1FB46EC69",
];

/// Type GUIDs marking a Xamarin.Mac project.
pub const XAMARIN_MAC_GUIDS: &[&str] = &[
    "42C0BBD9-55CE-4FC1-8D90-A7348ABAFB23",
    "A3F8F2AB-B479-4A4A-A458-A89E7DC349F1",
];

/// Type GUIDs marking a Xamarin.tvOS project.
pub const TVOS_GUIDS: &[&str] = &["06FA79CB-D6CD-4721-BB4B-1BD202089C55"];

/// Type GUID of a solution folder. Such entries are not projects.
pub const SOLUTION_FOLDER_GUID: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

// Lookup order applied to every token.
const PRIORITY_TABLE: &[(ProjectType, &[&str])] = &[
    (ProjectType::Android, ANDROID_GUIDS),
    (ProjectType::Ios, IOS_GUIDS),
    (ProjectType::MacOs, MONO_MAC_GUIDS),
    (ProjectType::MacOs, XAMARIN_MAC_GUIDS),
    (ProjectType::TvOs, TVOS_GUIDS),
];

/// Strips surrounding whitespace and braces from a GUID and upper-cases it.
pub fn normalize_guid(guid: &str) -> String {
    guid.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_ascii_uppercase()
}

/// Determines the project type from a `;` separated list of type GUIDs.
///
/// Tokens are scanned in the order they are declared and each token is
/// looked up in the table Android, iOS, MonoMac, Xamarin.Mac, tvOS. The first
/// token that hits any table entry decides the type, so a project declaring
/// `{tvOS};{iOS}` is a tvOS project. No hit yields [`ProjectType::Unknown`].
///
/// ```
/// use xamarin_builder_sdk::ProjectType;
/// use xamarin_builder_sdk::model::identify_project_type;
///
/// let guids = "{FEACFBD2-3405-455C-9665-78FE426C6842};{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}";
/// assert_eq!(identify_project_type(guids), ProjectType::Ios);
/// assert_eq!(identify_project_type(""), ProjectType::Unknown);
/// ```
pub fn identify_project_type(type_guids: &str) -> ProjectType {
    for token in type_guids.split(';') {
        let guid = normalize_guid(token);
        if guid.is_empty() {
            continue;
        }
        for (project_type, guids) in PRIORITY_TABLE {
            if guids.iter().any(|known| known.eq_ignore_ascii_case(&guid)) {
                return *project_type;
            }
        }
    }
    ProjectType::Unknown
}
