#[cfg(test)]
pub async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    let mut idx = 0;
    loop {
        let tmp_dir = std::env::temp_dir().join(format!("rsel_test{}", &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx += 1;
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

#[cfg(test)]
pub async fn setup_test_dir() -> anyhow::Result<std::path::PathBuf> {
    // create a temporary directory
    let tmp_dir = create_temp_dir().await?;
    // src
    // |- a.txt
    // |- b.txt
    // |- c.txt
    // |- day1
    //    |- ISR-03-44-nb-sbyq1-9g931q103q-utt.wav
    //    |- ISR-03-44-nb-sbyq1-7h2k-utt.wav
    //    |- d1
    //       |- a.txt
    // |- empty
    // dst
    let src_path = tmp_dir.join("src");
    tokio::fs::create_dir(&src_path).await?;
    tokio::fs::write(src_path.join("a.txt"), "a").await?;
    tokio::fs::write(src_path.join("b.txt"), "b").await?;
    tokio::fs::write(src_path.join("c.txt"), "c").await?;
    let day1_path = src_path.join("day1");
    tokio::fs::create_dir(&day1_path).await?;
    tokio::fs::write(
        day1_path.join("ISR-03-44-nb-sbyq1-9g931q103q-utt.wav"),
        "9g931q103q",
    )
    .await?;
    tokio::fs::write(day1_path.join("ISR-03-44-nb-sbyq1-7h2k-utt.wav"), "7h2k").await?;
    let d1_path = day1_path.join("d1");
    tokio::fs::create_dir(&d1_path).await?;
    tokio::fs::write(d1_path.join("a.txt"), "nested a").await?;
    tokio::fs::create_dir(src_path.join("empty")).await?;
    tokio::fs::create_dir(tmp_dir.join("dst")).await?;
    Ok(tmp_dir)
}

#[cfg(test)]
pub async fn dir_file_names(dir: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
