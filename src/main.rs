fn main() -> std::process::ExitCode {
    vitalbrief_lib::run()
}
