//! Build-include (`Definitions.mk`) emitter.
//!
//! Required keys abort generation when missing; optional keys are emitted
//! only when they resolve, some with documented fallback defaults.

use crate::error::Result;
use crate::resolve::Resolver;

/// Render the build-include text for a resolved configuration.
pub fn generate(mk: &Resolver) -> Result<String> {
    let mut out = String::new();

    // Required keys.
    out.push_str(&format!("TARNAME\t = {}\n", mk.r_lookup("name")?));
    out.push_str(&format!("VERSION\t = {}\n", mk.r_lookup("version")?));
    match mk.r_lookup("pkgname") {
        Ok(pkgname) => out.push_str(&format!("NAME\t = {pkgname}\n")),
        Err(_) => out.push_str("NAME\t = $(TARNAME)_$(VERSION)\n"),
    }
    out.push_str(&format!(
        "TARBALL-EXTENSION \t = {}\n",
        mk.r_lookup("extension")?
    ));
    out.push_str(&format!(
        "DESCRIPTION \t = {}\n",
        mk.r_lookup("description")?
    ));
    out.push_str(&format!("PKGROOT \t = {}\n", mk.r_lookup("root")?));

    // Optional keys, emitted only when resolvable.
    if let Ok(release) = mk.r_lookup("release") {
        out.push_str(&format!("RELEASE\t = {release}\n"));
    }
    if let Ok(vendor) = mk.r_lookup("vendor") {
        out.push_str(&format!("VENDOR\t = {vendor}\n"));
    }
    if let Ok(src_tarball) = mk.r_lookup("src_tarball") {
        out.push_str(&format!("SRC_TARBALL\t = {src_tarball}\n"));
    }
    if let Ok(src_dir) = mk.r_lookup("src_dir") {
        out.push_str(&format!("SRC_DIR\t = {src_dir}\n"));
    }
    if let Ok(no_src_dir) = mk.r_lookup("no_src_dir") {
        out.push_str(&format!("NO_SRC_DIR\t = {no_src_dir}\n"));
    }

    match mk.r_lookup("build.preconfigure") {
        Ok(preconfigure) => out.push_str(&format!("PRECONFIGURE\t = {preconfigure}\n")),
        Err(_) => out.push_str("PRECONFIGURE = echo no preconfigure required\n"),
    }

    // A package-supplied configure command switches CONFIGURE_ARGS from
    // appending to the standard arguments to replacing them.
    let mut std_configure = "+=";
    if let Ok(configure) = mk.r_lookup("build.configure") {
        out.push_str(&format!("CONFIGURE \t = {configure}\n"));
        std_configure = "=";
    }
    if let Ok(args) = mk.r_lookup("build.configure_args") {
        out.push_str(&format!("CONFIGURE_ARGS \t {std_configure} {args}\n"));
    }

    if let Ok(mods) = mk.lookup_and_resolve("build.modules", " ", None) {
        let mods = if mods == "None" { String::new() } else { mods };
        out.push_str(&format!("MODULES \t = {mods}\n"));
    }

    let mpath = mk.r_lookup("module.path").unwrap_or_default();
    out.push_str(&format!("MODULESPATH \t = {mpath}\n"));
    let mname = mk.r_lookup("module.name").unwrap_or_default();
    out.push_str(&format!("MODULENAME \t = {mname}\n"));

    if let Ok(target) = mk.r_lookup("build.target") {
        out.push_str(&format!("BUILDTARGET \t = {target}\n"));
    }
    if let Ok(pkgmake) = mk.r_lookup("build.pkgmake") {
        out.push_str(&format!("PKGMAKE \t = {pkgmake}\n"));
    }

    match mk.r_lookup("build.patchfile") {
        Ok(patchfile) => {
            out.push_str(&format!("PATCH_FILE \t = {patchfile}\n"));
            out.push_str("PATCH_METHOD \t = $(PATCH_CMD)\n");
        }
        Err(_) => {
            out.push_str("PATCH_METHOD \t = $(PATCH_NONE)\n");
        }
    }

    if let Ok(makeinstall) = mk.r_lookup("install.makeinstall") {
        out.push_str(&format!("MAKEINSTALL \t = {makeinstall}\n"));
    }
    if let Ok(installextra) = mk.r_lookup("install.installextra") {
        out.push_str(&format!("INSTALLEXTRA\t = {installextra}\n"));
    }

    if let Ok(reqs) = mk.lookup_and_resolve("requires", " ", None) {
        out.push_str(&format!("RPM.REQUIRES\t = {reqs}\n"));
    }
    match mk.lookup_and_resolve("provides", " ", None) {
        Ok(provs) => out.push_str(&format!("RPM.PROVIDES\t = {provs}\n")),
        Err(_) => out.push_str("RPM.PROVIDES\t = \n"),
    }

    // Files are joined with a make line continuation so the list survives as
    // one assignment.
    match mk.lookup_and_resolve("files", "\\n\\\n", None) {
        Ok(files) => out.push_str(&format!("RPM.FILES\t = {files}\n")),
        Err(_) => out.push_str("RPM.FILES\t = $(PKGROOT)\n"),
    }

    if let Ok(extras) = mk.lookup_and_resolve("rpm.extras", "\\n\\\n", Some(" ")) {
        out.push_str(&format!("RPM.EXTRAS\t = {extras}\n"));
    }
    if let Ok(scriptlets) = mk.r_lookup("rpm.scriptlets") {
        out.push_str(&format!("RPM.SCRIPTLETS.FILE\t = {scriptlets}\n"));
    }

    Ok(out)
}
