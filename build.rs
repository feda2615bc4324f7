use vergen::EmitBuilder;

fn main() {
    // 构建时间与 git 提交号，启动时写入日志；不在 git 仓库中时 vergen 会输出占位值
    EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()
        .expect("Failed to generate build information");
}
