use phf::phf_map;

pub const COMPILER: &str = "VCCLCompilerTool";
pub const LINKER: &str = "VCLinkerTool";
pub const LIBRARIAN: &str = "VCLibrarianTool";

static TOOLS: phf::Map<&'static str, &'static str> = phf_map! {
    "VCCLCompilerTool" => "C/C++ compiler",
    "VCLinkerTool" => "linker",
    "VCLibrarianTool" => "librarian",
    "VCResourceCompilerTool" => "resource compiler",
    "VCMIDLTool" => "MIDL compiler",
    "VCManifestTool" => "manifest tool",
    "VCBscMakeTool" => "browse information maintainer",
    "VCPreBuildEventTool" => "pre-build event",
    "VCPreLinkEventTool" => "pre-link event",
    "VCPostBuildEventTool" => "post-build event",
};

/// Describes a tool section by name.
/// Returns human-readable description
/// or the name itself if it's not a known tool
#[must_use]
pub fn describe_tool(name: &str) -> &str {
    TOOLS.get(name).unwrap_or(&name)
}

/// Shows whether the name belongs to one of the
/// well-known Visual C++ build tools
#[must_use]
pub fn is_known_tool(name: &str) -> bool {
    TOOLS.contains_key(name)
}
