fn main() {
    auto_archive_lib::run()
}
