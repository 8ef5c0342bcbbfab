fn main() {
    vecmap_editor::run();
}
