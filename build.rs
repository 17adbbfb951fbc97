fn main() {
    // ESP-IDF link arguments are only needed for the Xtensa firmware build.
    // Host builds (simulator, tests) skip the ESP-IDF environment entirely.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("xtensa") {
        embuild::espidf::sysenv::output();
    }
}
