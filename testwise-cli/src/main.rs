fn main() -> anyhow::Result<()> {
    testwise_cli::run()
}
