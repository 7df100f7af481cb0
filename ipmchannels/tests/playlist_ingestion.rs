use ipmchannels::{ChannelDirectory, DEFAULT_GROUP, parse_playlist};

const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-logo="http://x/logo.png" group-title="News;Sports",ABC News
http://stream/abc
#EXTINF:-1 tvg-id="cbs",CBS
http://stream/cbs
#EXTINF:-1 tvg-logo="http://x/nbc.png",NBC
rtmp://host:1935/app/nbc
"#;

#[test]
fn multi_group_entry_fans_out() {
    let channels = parse_playlist(PLAYLIST);
    let abc: Vec<_> = channels.iter().filter(|c| c.name == "ABC News").collect();

    assert_eq!(abc.len(), 2);
    for c in &abc {
        assert_eq!(c.url, "http://stream/abc");
        assert_eq!(c.logo, "http://x/logo.png");
    }
    assert_eq!(abc[0].group, "News");
    assert_eq!(abc[1].group, "Sports");
}

#[test]
fn missing_group_title_yields_other() {
    let channels = parse_playlist(PLAYLIST);

    let cbs = channels.iter().find(|c| c.name == "CBS").unwrap();
    assert_eq!(cbs.group, DEFAULT_GROUP);
    assert_eq!(cbs.logo, "");

    // tvg-logo sans group-title
    let nbc = channels.iter().find(|c| c.name == "NBC").unwrap();
    assert_eq!(nbc.group, "Other");
    assert_eq!(nbc.logo, "http://x/nbc.png");
}

#[test]
fn directory_order_is_source_order() {
    let dir = ChannelDirectory::new(parse_playlist(PLAYLIST));
    let names: Vec<_> = dir.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ABC News", "ABC News", "CBS", "NBC"]);
    assert_eq!(dir.normalize(-1), Some(3));
}

#[test]
fn channel_serializes_with_plain_fields() -> anyhow::Result<()> {
    let channels = parse_playlist(PLAYLIST);
    let json = serde_json::to_value(&channels[2])?;
    assert_eq!(json["name"], "CBS");
    assert_eq!(json["group"], "Other");
    Ok(())
}
