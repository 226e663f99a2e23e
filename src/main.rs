fn main() -> std::process::ExitCode {
    epicrisis_lib::run()
}
