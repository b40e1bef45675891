fn main() -> std::process::ExitCode {
    recipe_label_console_lib::run()
}
